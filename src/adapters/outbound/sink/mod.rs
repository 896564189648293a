/// Control-plane sink adapters
mod json_lines_sink;

pub use json_lines_sink::{JsonLinesSink, SinkSummary};
