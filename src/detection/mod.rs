/// Detection domain - pure models and in-memory services
///
/// Nothing in this layer performs I/O or spawns tasks; the application layer
/// drives it.
pub mod domain;
pub mod services;
