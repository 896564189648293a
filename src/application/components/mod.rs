/// Pipeline components
///
/// Long-lived parts of the sensor. Each one owns a bounded queue drained by
/// a single task, started and stopped through the [`Sensor`] that wires them
/// together.
mod detector;
mod enforcer;
mod enricher;
mod output_queue;
mod sensor;

pub use detector::{Detector, DetectorCollaborators};
pub use enforcer::{
    Enforcer, EnforcerSettings, ExecutorRegistry, DEFAULT_BYPASS_ANNOTATION,
    DEFAULT_ENFORCEMENT_TIMEOUT,
};
pub use enricher::{
    EnricherSettings, ImageEnricher, DEFAULT_MAX_CONCURRENT_SCANS, DEFAULT_SCAN_TIMEOUT,
};
pub use output_queue::OutputQueue;
pub use sensor::Sensor;
