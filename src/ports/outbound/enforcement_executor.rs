use crate::detection::domain::EnforcementCommand;
use crate::shared::Result;
use async_trait::async_trait;

/// EnforcementExecutor port - carries out one kind of cluster action
///
/// Executors are registered with the enforcer per enforcement action. The
/// enforcer bounds every call with a timeout and cancels it on shutdown, so
/// implementations need not do either themselves.
#[async_trait]
pub trait EnforcementExecutor: Send + Sync {
    async fn execute(&self, command: &EnforcementCommand) -> Result<()>;
}
