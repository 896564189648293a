use crate::application::dto::MsgToSensor;
use crate::detection::domain::{Deployment, DeploymentId, ProcessIndicator, ResourceAction};
use crate::shared::Result;
use tokio_util::sync::CancellationToken;

/// DetectionPort - Inbound port of the detection pipeline
///
/// This port defines the interface that the cluster listener, the output
/// queue and the control-plane connection use to drive detection. Every
/// method returns without waiting for enrichment or policy evaluation;
/// results are delivered asynchronously on the detector's output stream.
///
/// Methods must be called from within a Tokio runtime.
pub trait DetectionPort: Send + Sync {
    /// Runs a deployment change through detection
    ///
    /// `context` is the processing scope; results produced after it is
    /// cancelled are never forwarded.
    fn process_deployment(
        &self,
        context: CancellationToken,
        deployment: Deployment,
        action: ResourceAction,
    );

    /// Forgets the dedupe state of the given deployments so that their next
    /// update is re-evaluated
    fn reprocess_deployments(&self, ids: &[DeploymentId]);

    /// Runs runtime detection for an observed process execution
    fn process_indicator(&self, context: CancellationToken, indicator: ProcessIndicator);

    /// Applies a control-plane message
    ///
    /// # Errors
    /// Returns an error only for configuration-level problems, such as a
    /// malformed policy sync.
    fn process_message(&self, message: MsgToSensor) -> Result<()>;
}
