use kube_sensor::detection::domain::{Alert, ProcessViolation};
use kube_sensor::prelude::*;
use parking_lot::Mutex;

/// Mock PolicyEngine for testing
///
/// Every active deploy-time policy fires for every deployment, listing the
/// image names it was evaluated with as violations. Runtime policies fire
/// only for processes outside a locked baseline and carry that process.
#[derive(Default)]
pub struct MockPolicyEngine {
    policies: Mutex<Vec<Policy>>,
    evaluated_images: Mutex<Vec<Vec<Image>>>,
}

#[allow(dead_code)]
impl MockPolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy_ids(&self) -> Vec<String> {
        self.policies.lock().iter().map(|p| p.id.clone()).collect()
    }

    /// Images passed to each deploy-time evaluation
    pub fn evaluated_images(&self) -> Vec<Vec<Image>> {
        self.evaluated_images.lock().clone()
    }
}

impl PolicyEngine for MockPolicyEngine {
    fn reconcile_policies(&self, policies: &[Policy]) {
        *self.policies.lock() = policies.to_vec();
    }

    fn detect_deployment(&self, deployment: &Deployment, images: &[Image]) -> Vec<Alert> {
        self.evaluated_images.lock().push(images.to_vec());
        let violations: Vec<String> = images.iter().map(|i| i.name.clone()).collect();
        self.policies
            .lock()
            .iter()
            .filter(|p| p.applies_to(LifecycleStage::Deploy))
            .map(|p| Alert::new(p, LifecycleStage::Deploy, deployment, violations.clone()))
            .collect()
    }

    fn detect_process(
        &self,
        deployment: &Deployment,
        _images: &[Image],
        indicator: &ProcessIndicator,
        outside_baseline: bool,
    ) -> Vec<Alert> {
        if !outside_baseline {
            return Vec::new();
        }
        self.policies
            .lock()
            .iter()
            .filter(|p| p.applies_to(LifecycleStage::Runtime))
            .map(|p| {
                Alert::new(
                    p,
                    LifecycleStage::Runtime,
                    deployment,
                    vec![indicator.signal.name.clone()],
                )
                .with_process_violation(ProcessViolation {
                    message: format!("Unexpected process {}", indicator.signal.name),
                    processes: vec![indicator.clone()],
                })
            })
            .collect()
    }
}
