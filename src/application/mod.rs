/// Application layer - Pipeline components and DTOs
///
/// This layer contains the detection pipeline that orchestrates domain
/// services and coordinates with infrastructure through ports.
pub mod components;
pub mod dto;
pub mod factories;
