/// Inbound ports (Driving ports) - Use case interfaces
///
/// These ports define the interfaces that external adapters (cluster
/// listener, control-plane connection, replay CLI) use to interact with the
/// application core.
pub mod detection_port;

pub use detection_port::DetectionPort;
