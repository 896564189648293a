use crate::detection::domain::{EnforcementAction, EnforcementCommand, EnforcementTarget};
use crate::ports::outbound::EnforcementExecutor;
use crate::shared::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

/// LoggingExecutor adapter - dry-run enforcement
///
/// Logs the cluster action it would take and remembers it, without touching
/// the cluster. Used for replays and for clusters where enforcement is
/// audited before being switched on.
#[derive(Debug, Default)]
pub struct LoggingExecutor {
    executed: Mutex<Vec<EnforcementCommand>>,
}

impl LoggingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands handled so far, in execution order
    pub fn executed(&self) -> Vec<EnforcementCommand> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl EnforcementExecutor for LoggingExecutor {
    async fn execute(&self, command: &EnforcementCommand) -> Result<()> {
        match &command.target {
            EnforcementTarget::Deployment {
                deployment_name,
                namespace,
                alert_id,
                ..
            } => info!(
                action = describe(command.action),
                deployment = %deployment_name,
                %namespace,
                %alert_id,
                "[dry-run] enforcing on deployment"
            ),
            EnforcementTarget::ContainerInstance {
                pod_id,
                container_name,
                alert_id,
                ..
            } => info!(
                action = describe(command.action),
                pod = %pod_id,
                container = %container_name,
                %alert_id,
                "[dry-run] enforcing on container instance"
            ),
        }
        self.executed.lock().push(command.clone());
        Ok(())
    }
}

fn describe(action: EnforcementAction) -> &'static str {
    match action {
        EnforcementAction::Unset => "none",
        EnforcementAction::ScaleToZero => "scale deployment to zero replicas",
        EnforcementAction::UnsatisfiableNodeConstraint => "add unsatisfiable node constraint",
        EnforcementAction::KillPod => "delete pod",
        EnforcementAction::FailKubeRequest => "reject API request",
    }
}
