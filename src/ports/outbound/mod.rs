/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define the interfaces that the application core uses
/// to interact with external systems (scan service, policy engine,
/// cluster actions, admission control, control-plane transport).
pub mod admission_control;
pub mod enforcement_executor;
pub mod event_sink;
pub mod image_scanner;
pub mod policy_engine;

pub use admission_control::AdmissionControlSettings;
pub use enforcement_executor::EnforcementExecutor;
pub use event_sink::EventSink;
pub use image_scanner::ImageScanner;
pub use policy_engine::PolicyEngine;
