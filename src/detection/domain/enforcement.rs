use super::alert::EnforcementAction;
use super::deployment::DeploymentId;
use serde::{Deserialize, Serialize};

/// What an enforcement command acts upon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnforcementTarget {
    /// The whole workload (deploy-time violations)
    Deployment {
        deployment_id: DeploymentId,
        deployment_name: String,
        namespace: String,
        alert_id: String,
    },
    /// A single running container instance (runtime violations)
    ContainerInstance {
        deployment_id: DeploymentId,
        pod_id: String,
        container_name: String,
        alert_id: String,
    },
}

impl EnforcementTarget {
    pub fn deployment_id(&self) -> &DeploymentId {
        match self {
            EnforcementTarget::Deployment { deployment_id, .. }
            | EnforcementTarget::ContainerInstance { deployment_id, .. } => deployment_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementCommand {
    pub action: EnforcementAction,
    pub target: EnforcementTarget,
}
