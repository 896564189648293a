use clap::Parser;
use std::path::PathBuf;

/// Replay cluster activity through the runtime security sensor
#[derive(Parser, Debug)]
#[command(name = "kube-sensor")]
#[command(version)]
#[command(
    about = "Replay cluster activity through the runtime security sensor",
    long_about = None
)]
pub struct Args {
    /// JSON-lines replay file of deployments, process indicators and
    /// control-plane messages
    #[arg(short, long, value_name = "FILE")]
    pub events: PathBuf,

    /// Initial policy set (YAML or JSON), applied before the replay starts
    #[arg(short, long, value_name = "FILE")]
    pub policies: Option<PathBuf>,

    /// Configuration file (defaults to ./kube-sensor.config.yml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file for the event streams (if not specified, outputs to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log filter, e.g. "info" or "kube_sensor=debug" (overrides RUST_LOG)
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Time to let in-flight detection settle after the last record
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub settle_ms: u64,
}

impl Args {
    /// Parses the process arguments, leaving the exit policy to the caller
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }
}
