/// Cluster-facing adapters: enforcement executors and admission control
mod logging_admission_control;
mod logging_executor;

pub use logging_admission_control::LoggingAdmissionControl;
pub use logging_executor::LoggingExecutor;
