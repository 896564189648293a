/// Outbound adapters - Infrastructure implementations of outbound ports
pub mod cluster;
pub mod policy;
pub mod scanner;
pub mod sink;
