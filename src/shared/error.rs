use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Replay completed
    Success = 0,
    /// Invalid command-line arguments (clap parsing errors)
    InvalidArguments = 2,
    /// Application error (config, replay file, startup failure, etc.)
    ApplicationError = 3,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::InvalidArguments => write!(f, "Invalid Arguments (2)"),
            ExitCode::ApplicationError => write!(f, "Application Error (3)"),
        }
    }
}

/// Sensor-specific errors.
///
/// Per-item failures inside the pipeline (scan errors, malformed alerts,
/// enforcement failures) are logged where they happen and never surface here.
/// These variants cover configuration-level problems and shutdown races.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Invalid policy sync: {reason}")]
    InvalidPolicy { reason: String },

    /// A message arrived after shutdown was requested and could not be delivered
    #[error("{component} is stopped; unable to deliver {what}")]
    ComponentStopped {
        component: &'static str,
        what: &'static str,
    },

    #[error("{component} has already been started")]
    AlreadyStarted { component: &'static str },

    #[error("Invalid configuration: {reason}\n\n💡 Hint: {hint}")]
    ConfigError { reason: String, hint: String },

    #[error("Failed to parse replay file: {path} (line {line})\nDetails: {details}")]
    ReplayParseError {
        path: PathBuf,
        line: usize,
        details: String,
    },
}
