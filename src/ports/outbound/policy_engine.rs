use crate::detection::domain::{Alert, Deployment, Image, Policy, ProcessIndicator};

/// PolicyEngine port - evaluates the active policy set
///
/// Detection is a pure function of its inputs and the reconciled policies.
/// The order of the returned alerts is not significant; callers sort them.
pub trait PolicyEngine: Send + Sync {
    /// Replaces the active policy set
    fn reconcile_policies(&self, policies: &[Policy]);

    /// Deploy-time detection over a deployment and its resolved images
    fn detect_deployment(&self, deployment: &Deployment, images: &[Image]) -> Vec<Alert>;

    /// Runtime detection for a single process execution
    ///
    /// `outside_baseline` is true when the process is not part of the
    /// container's locked process baseline.
    fn detect_process(
        &self,
        deployment: &Deployment,
        images: &[Image],
        indicator: &ProcessIndicator,
        outside_baseline: bool,
    ) -> Vec<Alert>;
}
