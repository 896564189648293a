use crate::detection::domain::{Deployment, DeploymentId};
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// ChangeDeduper decides whether a deployment update warrants re-running
/// detection.
///
/// Returning `true` too often only costs performance; correctness never
/// depends on the deduper skipping work.
pub trait ChangeDeduper: Send + Sync {
    /// Returns `false` when the deployment is unchanged since it was last
    /// accepted. Returning `true` records the deployment as accepted.
    fn needs_processing(&self, deployment: &Deployment) -> bool;

    /// Records the deployment as accepted regardless of its previous state
    fn add_deployment(&self, deployment: &Deployment);

    fn remove_deployment(&self, id: &DeploymentId);

    /// Forgets every deployment, forcing full re-evaluation
    fn reset(&self);
}

/// Deduper keyed on a structural hash of the security-relevant fields.
///
/// `state_timestamp` and `ready_replicas` change on every status update and
/// are excluded from the hash.
#[derive(Debug, Default)]
pub struct HashDeduper {
    hashes: RwLock<HashMap<DeploymentId, u64>>,
}

impl HashDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    fn content_hash(deployment: &Deployment) -> u64 {
        let mut hasher = DefaultHasher::new();
        deployment.id.hash(&mut hasher);
        deployment.name.hash(&mut hasher);
        deployment.namespace.hash(&mut hasher);
        deployment.kind.hash(&mut hasher);
        deployment.labels.hash(&mut hasher);
        deployment.annotations.hash(&mut hasher);
        deployment.service_account.hash(&mut hasher);
        deployment.replicas.hash(&mut hasher);
        deployment.containers.hash(&mut hasher);
        hasher.finish()
    }
}

impl ChangeDeduper for HashDeduper {
    fn needs_processing(&self, deployment: &Deployment) -> bool {
        let hash = Self::content_hash(deployment);
        let mut hashes = self.hashes.write();
        if hashes.get(&deployment.id) == Some(&hash) {
            return false;
        }
        hashes.insert(deployment.id.clone(), hash);
        true
    }

    fn add_deployment(&self, deployment: &Deployment) {
        let hash = Self::content_hash(deployment);
        self.hashes.write().insert(deployment.id.clone(), hash);
    }

    fn remove_deployment(&self, id: &DeploymentId) {
        self.hashes.write().remove(id);
    }

    fn reset(&self) {
        self.hashes.write().clear();
    }
}

/// Deduper that never skips
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughDeduper;

impl ChangeDeduper for PassThroughDeduper {
    fn needs_processing(&self, _deployment: &Deployment) -> bool {
        true
    }

    fn add_deployment(&self, _deployment: &Deployment) {}

    fn remove_deployment(&self, _id: &DeploymentId) {}

    fn reset(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::{Container, ImageReference};

    fn deployment() -> Deployment {
        Deployment::new("d1", "web").with_container(Container::new(
            "app",
            ImageReference::new("sha256:1", "nginx:1.25"),
        ))
    }

    #[test]
    fn test_unchanged_deployment_is_skipped() {
        let deduper = HashDeduper::new();
        deduper.add_deployment(&deployment());

        assert!(!deduper.needs_processing(&deployment()));
    }

    #[test]
    fn test_status_only_change_is_skipped() {
        let deduper = HashDeduper::new();
        deduper.add_deployment(&deployment());

        let mut status_update = deployment().with_state_timestamp(9);
        status_update.ready_replicas = 3;

        assert!(!deduper.needs_processing(&status_update));
    }

    #[test]
    fn test_spec_change_needs_processing_once() {
        let deduper = HashDeduper::new();
        deduper.add_deployment(&deployment());

        let mut changed = deployment();
        changed.containers[0].privileged = true;

        assert!(deduper.needs_processing(&changed));
        // The new hash was recorded
        assert!(!deduper.needs_processing(&changed));
    }

    #[test]
    fn test_unknown_deployment_needs_processing() {
        let deduper = HashDeduper::new();
        assert!(deduper.needs_processing(&deployment()));
    }

    #[test]
    fn test_remove_and_reset() {
        let deduper = HashDeduper::new();
        deduper.add_deployment(&deployment());
        deduper.remove_deployment(&DeploymentId::new("d1"));
        assert!(deduper.needs_processing(&deployment()));

        deduper.reset();
        assert!(deduper.needs_processing(&deployment()));
    }

    #[test]
    fn test_pass_through_always_processes() {
        let deduper = PassThroughDeduper;
        deduper.add_deployment(&deployment());
        assert!(deduper.needs_processing(&deployment()));
        assert!(deduper.needs_processing(&deployment()));
    }
}
