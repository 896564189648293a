mod sensor_factory;

pub use sensor_factory::{SensorAdapters, SensorFactory, SensorSettings};
