use crate::detection::domain::Policy;
use crate::ports::outbound::AdmissionControlSettings;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Admission-control settings kept in memory and logged
///
/// Stands in for the admission webhook's configuration store: records the
/// ids of the deploy-time policies it would enforce at admission and counts
/// cache flushes.
#[derive(Debug, Default)]
pub struct LoggingAdmissionControl {
    policy_ids: RwLock<Vec<String>>,
    flushes: AtomicUsize,
}

impl LoggingAdmissionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy_ids(&self) -> Vec<String> {
        self.policy_ids.read().clone()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl AdmissionControlSettings for LoggingAdmissionControl {
    fn update_policies(&self, policies: &[Policy]) {
        let ids: Vec<String> = policies
            .iter()
            .filter(|policy| !policy.disabled && policy.enforcement_action.is_set())
            .map(|policy| policy.id.clone())
            .collect();
        info!(enforced = ids.len(), "Admission control policies updated");
        *self.policy_ids.write() = ids;
    }

    fn flush_cache(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        info!("Admission control cache flushed");
    }
}
