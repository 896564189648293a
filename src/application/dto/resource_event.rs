use super::sensor_event::SensorEvent;
use crate::detection::domain::{Deployment, DeploymentId, ResourceAction};
use tokio_util::sync::CancellationToken;

/// A deployment to run through the detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorMessage {
    pub deployment: Deployment,
    pub action: ResourceAction,
}

/// Batch produced by the cluster listener for one observed resource change
///
/// `context` is the processing scope the batch was created in; if it is
/// cancelled before the batch is drained, the whole batch is dropped.
#[derive(Debug, Clone)]
pub struct ResourceEvent {
    pub forward_messages: Vec<SensorEvent>,
    pub detector_messages: Vec<DetectorMessage>,
    pub reprocess_deployments: Vec<DeploymentId>,
    pub context: CancellationToken,
}

impl ResourceEvent {
    pub fn new(context: CancellationToken) -> Self {
        Self {
            forward_messages: Vec::new(),
            detector_messages: Vec::new(),
            reprocess_deployments: Vec::new(),
            context,
        }
    }

    /// The usual listener batch for a deployment change: forward the
    /// deployment itself and run it through detection
    pub fn for_deployment(
        deployment: Deployment,
        action: ResourceAction,
        context: CancellationToken,
    ) -> Self {
        let mut event = Self::new(context);
        event
            .forward_messages
            .push(SensorEvent::deployment(action, deployment.clone()));
        event
            .detector_messages
            .push(DetectorMessage { deployment, action });
        event
    }
}
