/// Data Transfer Objects for application layer
///
/// Wire-level messages exchanged with the control plane and the batches the
/// cluster listener hands to the output queue.
mod dedupe_mode;
mod resource_event;
mod sensor_event;
mod sensor_message;

pub use dedupe_mode::DedupeMode;
pub use resource_event::{DetectorMessage, ResourceEvent};
pub use sensor_event::{ExpiringMessage, SensorEnforcement, SensorEvent, SensorEventResource};
pub use sensor_message::MsgToSensor;
