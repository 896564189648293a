use crate::detection::domain::{
    AlertResults, Deployment, EnforcementAction, EnforcementCommand, EnforcementTarget,
    ResourceAction,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum SensorEventResource {
    AlertResults(AlertResults),
    Deployment(Deployment),
}

/// Event sent to the control plane on the main event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    pub id: String,
    pub action: ResourceAction,
    pub resource: SensorEventResource,
}

impl SensorEvent {
    pub fn alert_results(action: ResourceAction, results: AlertResults) -> Self {
        Self {
            id: results.deployment_id.to_string(),
            action,
            resource: SensorEventResource::AlertResults(results),
        }
    }

    pub fn deployment(action: ResourceAction, deployment: Deployment) -> Self {
        Self {
            id: deployment.id.to_string(),
            action,
            resource: SensorEventResource::Deployment(deployment),
        }
    }

    pub fn as_alert_results(&self) -> Option<&AlertResults> {
        match &self.resource {
            SensorEventResource::AlertResults(results) => Some(results),
            SensorEventResource::Deployment(_) => None,
        }
    }
}

/// Report of an executed enforcement, sent on the enforcement stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorEnforcement {
    pub action: EnforcementAction,
    pub target: EnforcementTarget,
}

impl From<EnforcementCommand> for SensorEnforcement {
    fn from(command: EnforcementCommand) -> Self {
        Self {
            action: command.action,
            target: command.target,
        }
    }
}

/// A sensor event bound to the processing scope that produced it.
///
/// Once the scope is cancelled the message is stale and must not be
/// forwarded.
#[derive(Debug, Clone)]
pub struct ExpiringMessage {
    pub event: SensorEvent,
    context: CancellationToken,
}

impl ExpiringMessage {
    pub fn new(event: SensorEvent, context: CancellationToken) -> Self {
        Self { event, context }
    }

    /// A message whose scope can never be cancelled
    pub fn non_expiring(event: SensorEvent) -> Self {
        Self::new(event, CancellationToken::new())
    }

    pub fn is_expired(&self) -> bool {
        self.context.is_cancelled()
    }
}
