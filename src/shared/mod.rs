/// Shared kernel - error types, result alias, capability negotiation and
/// input file checks
pub mod capabilities;
pub mod error;
pub mod result;
pub mod security;

pub use capabilities::{Capability, CapabilityHandle, CapabilitySet};
pub use error::{ExitCode, SensorError};
pub use result::Result;
