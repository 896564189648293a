/// Inbound adapters - offline sources that drive the sensor
mod policy_file;
mod replay_reader;

pub use policy_file::load_policies;
pub use replay_reader::{ReplayReader, ReplayRecord};
