use super::alert::{EnforcementAction, LifecycleStage};
use super::image::Severity;
use serde::{Deserialize, Serialize};

/// Matching criteria understood by the rule-based policy engine.
///
/// Every non-empty criterion must match for a policy to be violated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyCriteria {
    /// Wildcard patterns matched against container image names
    #[serde(default)]
    pub image_name_patterns: Vec<String>,
    /// Violated when any container runs privileged
    #[serde(default)]
    pub privileged: bool,
    /// Violated when any image has a vulnerability at or above this CVSS score
    #[serde(default)]
    pub min_cvss: Option<f32>,
    /// Violated when any image could not be scanned
    #[serde(default)]
    pub unscanned_image: bool,
    /// Wildcard patterns matched against process names (runtime only)
    #[serde(default)]
    pub process_name_patterns: Vec<String>,
    /// Only violated when the process is outside a locked baseline (runtime only)
    #[serde(default)]
    pub outside_baseline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub lifecycle_stages: Vec<LifecycleStage>,
    #[serde(default)]
    pub enforcement_action: EnforcementAction,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub criteria: PolicyCriteria,
}

fn default_severity() -> Severity {
    Severity::Medium
}

impl Policy {
    pub fn new(id: impl Into<String>, name: impl Into<String>, stage: LifecycleStage) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            severity: Severity::Medium,
            lifecycle_stages: vec![stage],
            enforcement_action: EnforcementAction::Unset,
            disabled: false,
            criteria: PolicyCriteria::default(),
        }
    }

    pub fn with_enforcement(mut self, action: EnforcementAction) -> Self {
        self.enforcement_action = action;
        self
    }

    pub fn with_criteria(mut self, criteria: PolicyCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn applies_to(&self, stage: LifecycleStage) -> bool {
        !self.disabled && self.lifecycle_stages.contains(&stage)
    }
}
