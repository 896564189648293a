use crate::detection::domain::{
    Alert, Deployment, Image, LifecycleStage, Policy, ProcessIndicator, ProcessViolation,
};
use crate::detection::services::NamePattern;
use crate::ports::outbound::PolicyEngine;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// A policy with its wildcard patterns compiled
struct CompiledPolicy {
    policy: Policy,
    image_patterns: Vec<NamePattern>,
    process_patterns: Vec<NamePattern>,
}

impl CompiledPolicy {
    fn compile(policy: &Policy) -> crate::shared::Result<Self> {
        let compile_all = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| NamePattern::new(p))
                .collect::<crate::shared::Result<Vec<_>>>()
        };
        Ok(Self {
            image_patterns: compile_all(&policy.criteria.image_name_patterns)?,
            process_patterns: compile_all(&policy.criteria.process_name_patterns)?,
            policy: policy.clone(),
        })
    }

    fn has_deploy_criteria(&self) -> bool {
        let criteria = &self.policy.criteria;
        !self.image_patterns.is_empty()
            || criteria.privileged
            || criteria.min_cvss.is_some()
            || criteria.unscanned_image
    }

    fn has_runtime_criteria(&self) -> bool {
        !self.process_patterns.is_empty() || self.policy.criteria.outside_baseline
    }

    /// Violation messages for a deployment, or `None` if any configured
    /// criterion is not met
    fn deploy_violations(&self, deployment: &Deployment, images: &[Image]) -> Option<Vec<String>> {
        let criteria = &self.policy.criteria;
        let mut violations = Vec::new();

        if !self.image_patterns.is_empty() {
            let matched: Vec<String> = images
                .iter()
                .filter_map(|image| {
                    self.image_patterns
                        .iter()
                        .find(|pattern| pattern.matches(&image.name))
                        .map(|pattern| {
                            format!("Image '{}' matches '{}'", image.name, pattern.as_str())
                        })
                })
                .collect();
            if matched.is_empty() {
                return None;
            }
            violations.extend(matched);
        }

        if criteria.privileged {
            let matched: Vec<String> = deployment
                .containers
                .iter()
                .filter(|container| container.privileged)
                .map(|container| format!("Container '{}' is privileged", container.name))
                .collect();
            if matched.is_empty() {
                return None;
            }
            violations.extend(matched);
        }

        if let Some(threshold) = criteria.min_cvss {
            let matched: Vec<String> = images
                .iter()
                .filter_map(|image| {
                    let scan = image.scan.as_ref()?;
                    let worst = scan
                        .vulnerabilities()
                        .filter(|vuln| vuln.cvss >= threshold)
                        .max_by(|a, b| a.cvss.total_cmp(&b.cvss))?;
                    Some(format!(
                        "Image '{}' has {} (CVSS {:.1})",
                        image.name, worst.cve, worst.cvss
                    ))
                })
                .collect();
            if matched.is_empty() {
                return None;
            }
            violations.extend(matched);
        }

        if criteria.unscanned_image {
            let matched: Vec<String> = images
                .iter()
                .filter(|image| !image.is_scanned())
                .map(|image| format!("Image '{}' has not been scanned", image.name))
                .collect();
            if matched.is_empty() {
                return None;
            }
            violations.extend(matched);
        }

        Some(violations)
    }

    fn process_matches(&self, indicator: &ProcessIndicator, outside_baseline: bool) -> bool {
        if self.policy.criteria.outside_baseline && !outside_baseline {
            return false;
        }
        self.process_patterns.is_empty()
            || self.process_patterns.iter().any(|pattern| {
                pattern.matches(&indicator.signal.name)
                    || pattern.matches(&indicator.signal.exec_file_path)
            })
    }
}

/// RulePolicyEngine adapter - evaluates declarative policy criteria
///
/// Every configured criterion of a policy must be met for it to be violated;
/// a policy without criteria for a stage never fires in that stage. Disabled
/// policies and policies with invalid patterns are not loaded.
#[derive(Default)]
pub struct RulePolicyEngine {
    policies: RwLock<Vec<CompiledPolicy>>,
}

impl RulePolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy_count(&self) -> usize {
        self.policies.read().len()
    }
}

impl PolicyEngine for RulePolicyEngine {
    fn reconcile_policies(&self, policies: &[Policy]) {
        let compiled: Vec<CompiledPolicy> = policies
            .iter()
            .filter(|policy| !policy.disabled)
            .filter_map(|policy| match CompiledPolicy::compile(policy) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    warn!(policy = %policy.id, error = %e, "Skipping policy with invalid pattern");
                    None
                }
            })
            .collect();
        debug!(active = compiled.len(), total = policies.len(), "Policies reconciled");
        *self.policies.write() = compiled;
    }

    fn detect_deployment(&self, deployment: &Deployment, images: &[Image]) -> Vec<Alert> {
        self.policies
            .read()
            .iter()
            .filter(|compiled| compiled.policy.applies_to(LifecycleStage::Deploy))
            .filter(|compiled| compiled.has_deploy_criteria())
            .filter_map(|compiled| {
                let violations = compiled.deploy_violations(deployment, images)?;
                Some(Alert::new(
                    &compiled.policy,
                    LifecycleStage::Deploy,
                    deployment,
                    violations,
                ))
            })
            .collect()
    }

    fn detect_process(
        &self,
        deployment: &Deployment,
        _images: &[Image],
        indicator: &ProcessIndicator,
        outside_baseline: bool,
    ) -> Vec<Alert> {
        self.policies
            .read()
            .iter()
            .filter(|compiled| compiled.policy.applies_to(LifecycleStage::Runtime))
            .filter(|compiled| compiled.has_runtime_criteria())
            .filter(|compiled| compiled.process_matches(indicator, outside_baseline))
            .map(|compiled| {
                let message = format!(
                    "Process '{}' executed in container '{}'",
                    indicator.signal.exec_file_path, indicator.container_name
                );
                Alert::new(
                    &compiled.policy,
                    LifecycleStage::Runtime,
                    deployment,
                    vec![message.clone()],
                )
                .with_process_violation(ProcessViolation {
                    message,
                    processes: vec![indicator.clone()],
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::{
        Container, EnforcementAction, ImageComponent, ImageReference, ImageScan, PolicyCriteria,
        Severity, Vulnerability,
    };
    use chrono::Utc;

    fn scanned(name: &str, cvss: f32) -> Image {
        Image {
            id: String::new(),
            name: name.to_string(),
            scan: Some(ImageScan {
                scan_time: Utc::now(),
                components: vec![ImageComponent {
                    name: "openssl".to_string(),
                    version: "3.0.1".to_string(),
                    vulns: vec![Vulnerability {
                        cve: "CVE-2024-0001".to_string(),
                        cvss,
                        severity: Severity::from_cvss_score(cvss),
                        fixed_by: None,
                    }],
                }],
            }),
            not_pullable: false,
        }
    }

    fn deploy_policy(id: &str, criteria: PolicyCriteria) -> Policy {
        Policy::new(id, id, LifecycleStage::Deploy).with_criteria(criteria)
    }

    fn engine(policies: &[Policy]) -> RulePolicyEngine {
        let engine = RulePolicyEngine::new();
        engine.reconcile_policies(policies);
        engine
    }

    fn deployment() -> Deployment {
        Deployment::new("d1", "web")
            .with_container(Container::new("app", ImageReference::new("", "nginx:latest")))
    }

    #[test]
    fn test_image_pattern_violation() {
        let engine = engine(&[deploy_policy(
            "latest-tag",
            PolicyCriteria {
                image_name_patterns: vec!["*:latest".to_string()],
                ..Default::default()
            },
        )]);

        let alerts = engine.detect_deployment(&deployment(), &[scanned("nginx:latest", 0.0)]);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].violations, vec!["Image 'nginx:latest' matches '*:latest'"]);
    }

    #[test]
    fn test_all_criteria_must_match() {
        let engine = engine(&[deploy_policy(
            "latest-and-critical",
            PolicyCriteria {
                image_name_patterns: vec!["*:latest".to_string()],
                min_cvss: Some(9.0),
                ..Default::default()
            },
        )]);

        assert!(engine
            .detect_deployment(&deployment(), &[scanned("nginx:latest", 5.0)])
            .is_empty());

        let alerts = engine.detect_deployment(&deployment(), &[scanned("nginx:latest", 9.8)]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].violations.len(), 2);
    }

    #[test]
    fn test_privileged_container() {
        let engine = engine(&[deploy_policy(
            "no-privileged",
            PolicyCriteria {
                privileged: true,
                ..Default::default()
            },
        )]);
        let mut privileged = deployment();
        privileged.containers[0].privileged = true;

        assert!(engine.detect_deployment(&deployment(), &[]).is_empty());
        let alerts = engine.detect_deployment(&privileged, &[]);
        assert_eq!(alerts[0].violations, vec!["Container 'app' is privileged"]);
    }

    #[test]
    fn test_unscanned_image() {
        let engine = engine(&[deploy_policy(
            "require-scan",
            PolicyCriteria {
                unscanned_image: true,
                ..Default::default()
            },
        )]);
        let placeholder = Image::placeholder(&ImageReference::new("", "nginx:latest"));

        assert_eq!(engine.detect_deployment(&deployment(), &[placeholder]).len(), 1);
        assert!(engine
            .detect_deployment(&deployment(), &[scanned("nginx:latest", 0.0)])
            .is_empty());
    }

    #[test]
    fn test_policy_without_criteria_never_fires() {
        let engine = engine(&[Policy::new("empty", "empty", LifecycleStage::Deploy)]);
        assert!(engine.detect_deployment(&deployment(), &[]).is_empty());
    }

    #[test]
    fn test_disabled_and_invalid_policies_not_loaded() {
        let mut disabled = deploy_policy(
            "disabled",
            PolicyCriteria {
                privileged: true,
                ..Default::default()
            },
        );
        disabled.disabled = true;
        let invalid = deploy_policy(
            "invalid",
            PolicyCriteria {
                image_name_patterns: vec!["bad pattern!".to_string()],
                ..Default::default()
            },
        );

        let engine = engine(&[disabled, invalid]);
        assert_eq!(engine.policy_count(), 0);
    }

    #[test]
    fn test_enforcement_copied_to_alert() {
        let engine = engine(&[deploy_policy(
            "no-privileged",
            PolicyCriteria {
                privileged: true,
                ..Default::default()
            },
        )
        .with_enforcement(EnforcementAction::ScaleToZero)]);
        let mut privileged = deployment();
        privileged.containers[0].privileged = true;

        let alerts = engine.detect_deployment(&privileged, &[]);
        assert_eq!(alerts[0].enforcement, Some(EnforcementAction::ScaleToZero));
    }

    #[test]
    fn test_process_pattern_and_baseline() {
        let shell = Policy::new("shell", "shell", LifecycleStage::Runtime).with_criteria(
            PolicyCriteria {
                process_name_patterns: vec!["*sh".to_string()],
                ..Default::default()
            },
        );
        let unexpected = Policy::new("unexpected", "unexpected", LifecycleStage::Runtime)
            .with_criteria(PolicyCriteria {
                outside_baseline: true,
                ..Default::default()
            });
        let engine = engine(&[shell, unexpected]);
        let bash = ProcessIndicator::new("d1", "pod-1", "app", "bash");
        let nginx = ProcessIndicator::new("d1", "pod-1", "app", "nginx");

        let alerts = engine.detect_process(&deployment(), &[], &bash, false);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].policy.id, "shell");
        let violation = alerts[0].process_violation.as_ref().unwrap();
        assert_eq!(violation.processes, vec![bash.clone()]);

        assert!(engine.detect_process(&deployment(), &[], &nginx, false).is_empty());
        let alerts = engine.detect_process(&deployment(), &[], &nginx, true);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].policy.id, "unexpected");
    }

    #[test]
    fn test_reconcile_replaces_policies() {
        let engine = engine(&[deploy_policy(
            "p1",
            PolicyCriteria {
                privileged: true,
                ..Default::default()
            },
        )]);
        assert_eq!(engine.policy_count(), 1);

        engine.reconcile_policies(&[]);
        assert_eq!(engine.policy_count(), 0);
    }
}
