use crate::detection::domain::{DeploymentId, ProcessBaseline, ProcessIndicator};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Tracks per-container process baselines for runtime detection
#[derive(Debug, Default)]
pub struct ProcessBaselineEvaluator {
    baselines: RwLock<HashMap<DeploymentId, HashMap<String, ProcessBaseline>>>,
}

impl ProcessBaselineEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the baseline of one container
    pub fn add_baseline(&self, baseline: ProcessBaseline) {
        self.baselines
            .write()
            .entry(baseline.deployment_id.clone())
            .or_default()
            .insert(baseline.container_name.clone(), baseline);
    }

    pub fn remove_deployment(&self, id: &DeploymentId) {
        self.baselines.write().remove(id);
    }

    /// True only when the container has a locked baseline that does not
    /// contain the process
    pub fn is_outside_locked_baseline(&self, indicator: &ProcessIndicator) -> bool {
        let baselines = self.baselines.read();
        baselines
            .get(&indicator.deployment_id)
            .and_then(|containers| containers.get(&indicator.container_name))
            .map(|baseline| baseline.locked && !baseline.contains(indicator))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn baseline(locked: bool) -> ProcessBaseline {
        ProcessBaseline {
            deployment_id: DeploymentId::new("d1"),
            container_name: "app".to_string(),
            locked,
            processes: BTreeSet::from(["/usr/sbin/nginx".to_string()]),
        }
    }

    #[test]
    fn test_process_in_locked_baseline() {
        let evaluator = ProcessBaselineEvaluator::new();
        evaluator.add_baseline(baseline(true));

        let indicator = ProcessIndicator::new("d1", "pod-1", "app", "/usr/sbin/nginx");
        assert!(!evaluator.is_outside_locked_baseline(&indicator));
    }

    #[test]
    fn test_process_outside_locked_baseline() {
        let evaluator = ProcessBaselineEvaluator::new();
        evaluator.add_baseline(baseline(true));

        let indicator = ProcessIndicator::new("d1", "pod-1", "app", "/bin/sh");
        assert!(evaluator.is_outside_locked_baseline(&indicator));
    }

    #[test]
    fn test_unlocked_baseline_never_flags() {
        let evaluator = ProcessBaselineEvaluator::new();
        evaluator.add_baseline(baseline(false));

        let indicator = ProcessIndicator::new("d1", "pod-1", "app", "/bin/sh");
        assert!(!evaluator.is_outside_locked_baseline(&indicator));
    }

    #[test]
    fn test_missing_baseline_never_flags() {
        let evaluator = ProcessBaselineEvaluator::new();
        let indicator = ProcessIndicator::new("d1", "pod-1", "app", "/bin/sh");
        assert!(!evaluator.is_outside_locked_baseline(&indicator));
    }

    #[test]
    fn test_remove_deployment_drops_baselines() {
        let evaluator = ProcessBaselineEvaluator::new();
        evaluator.add_baseline(baseline(true));
        evaluator.remove_deployment(&DeploymentId::new("d1"));

        let indicator = ProcessIndicator::new("d1", "pod-1", "app", "/bin/sh");
        assert!(!evaluator.is_outside_locked_baseline(&indicator));
    }
}
