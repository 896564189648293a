use crate::detection::domain::{Deployment, DeploymentId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// DeploymentStore - in-memory authoritative map of known deployments
///
/// Readers interleave freely; writers serialize. Every read returns an owned
/// copy so callers can never mutate the stored entry.
#[derive(Debug, Default)]
pub struct DeploymentStore {
    deployments: RwLock<HashMap<DeploymentId, Deployment>>,
}

impl DeploymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, deployment: Deployment) {
        self.deployments
            .write()
            .insert(deployment.id.clone(), deployment);
    }

    pub fn remove(&self, id: &DeploymentId) -> Option<Deployment> {
        self.deployments.write().remove(id)
    }

    pub fn get(&self, id: &DeploymentId) -> Option<Deployment> {
        self.deployments.read().get(id).cloned()
    }

    pub fn get_all(&self) -> Vec<Deployment> {
        self.deployments.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.deployments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.read().is_empty()
    }
}
