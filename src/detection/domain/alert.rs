use super::deployment::{Deployment, DeploymentId};
use super::image::Severity;
use super::policy::Policy;
use super::process::ProcessIndicator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Policy evaluation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStage {
    /// Static, admission-time evaluation of the deployment spec
    Deploy,
    /// Process-execution-time evaluation
    Runtime,
}

/// Remediation requested by a policy when it is violated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnforcementAction {
    #[default]
    Unset,
    ScaleToZero,
    UnsatisfiableNodeConstraint,
    KillPod,
    FailKubeRequest,
}

impl EnforcementAction {
    pub fn is_set(self) -> bool {
        self != EnforcementAction::Unset
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationState {
    #[default]
    Active,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRef {
    pub id: String,
    pub name: String,
    pub severity: Severity,
}

impl From<&Policy> for PolicyRef {
    fn from(policy: &Policy) -> Self {
        Self {
            id: policy.id.clone(),
            name: policy.name.clone(),
            severity: policy.severity,
        }
    }
}

/// Subset of the deployment that an alert carries with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDeployment {
    pub id: DeploymentId,
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl From<&Deployment> for AlertDeployment {
    fn from(deployment: &Deployment) -> Self {
        Self {
            id: deployment.id.clone(),
            name: deployment.name.clone(),
            namespace: deployment.namespace.clone(),
            annotations: deployment.annotations.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessViolation {
    pub message: String,
    pub processes: Vec<ProcessIndicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub policy: PolicyRef,
    pub lifecycle_stage: LifecycleStage,
    pub deployment: AlertDeployment,
    #[serde(default)]
    pub violations: Vec<String>,
    #[serde(default)]
    pub process_violation: Option<ProcessViolation>,
    #[serde(default)]
    pub enforcement: Option<EnforcementAction>,
    #[serde(default)]
    pub state: ViolationState,
    pub time: DateTime<Utc>,
}

impl Alert {
    /// Creates an active alert for a policy violated by a deployment.
    ///
    /// The policy's enforcement action is only copied onto the alert when it
    /// is set.
    pub fn new(
        policy: &Policy,
        stage: LifecycleStage,
        deployment: &Deployment,
        violations: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            policy: PolicyRef::from(policy),
            lifecycle_stage: stage,
            deployment: AlertDeployment::from(deployment),
            violations,
            process_violation: None,
            enforcement: policy
                .enforcement_action
                .is_set()
                .then_some(policy.enforcement_action),
            state: ViolationState::Active,
            time: Utc::now(),
        }
    }

    pub fn with_process_violation(mut self, violation: ProcessViolation) -> Self {
        self.process_violation = Some(violation);
        self
    }
}

/// Output of one policy evaluation pass for a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertResults {
    pub deployment_id: DeploymentId,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    pub stage: LifecycleStage,
}

impl AlertResults {
    /// Creates alert results, ordering alerts by policy id for determinism
    pub fn new(deployment_id: DeploymentId, mut alerts: Vec<Alert>, stage: LifecycleStage) -> Self {
        alerts.sort_by(|a, b| a.policy.id.cmp(&b.policy.id));
        Self {
            deployment_id,
            alerts,
            stage,
        }
    }

    /// Marker pushed on removal that supersedes any pending deploy-time alerts
    pub fn removal_marker(deployment_id: DeploymentId) -> Self {
        Self {
            deployment_id,
            alerts: Vec::new(),
            stage: LifecycleStage::Deploy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_results_sorted_by_policy_id() {
        let deployment = Deployment::new("d1", "web");
        let p_b = Policy::new("b", "B", LifecycleStage::Deploy);
        let p_a = Policy::new("a", "A", LifecycleStage::Deploy);
        let results = AlertResults::new(
            deployment.id.clone(),
            vec![
                Alert::new(&p_b, LifecycleStage::Deploy, &deployment, vec![]),
                Alert::new(&p_a, LifecycleStage::Deploy, &deployment, vec![]),
            ],
            LifecycleStage::Deploy,
        );
        let ids: Vec<&str> = results.alerts.iter().map(|a| a.policy.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_alert_copies_only_set_enforcement() {
        let deployment = Deployment::new("d1", "web");
        let unset = Policy::new("p1", "P1", LifecycleStage::Deploy);
        let enforced = Policy::new("p2", "P2", LifecycleStage::Deploy)
            .with_enforcement(EnforcementAction::ScaleToZero);

        let a1 = Alert::new(&unset, LifecycleStage::Deploy, &deployment, vec![]);
        let a2 = Alert::new(&enforced, LifecycleStage::Deploy, &deployment, vec![]);

        assert_eq!(a1.enforcement, None);
        assert_eq!(a2.enforcement, Some(EnforcementAction::ScaleToZero));
        assert_ne!(a1.id, a2.id);
    }

    #[test]
    fn test_enforcement_action_serde() {
        let json = serde_json::to_string(&EnforcementAction::KillPod).unwrap();
        assert_eq!(json, "\"KILL_POD\"");
        let parsed: EnforcementAction = serde_json::from_str("\"SCALE_TO_ZERO\"").unwrap();
        assert_eq!(parsed, EnforcementAction::ScaleToZero);
    }
}
