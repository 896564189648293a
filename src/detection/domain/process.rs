use super::deployment::DeploymentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSignal {
    pub name: String,
    #[serde(default)]
    pub exec_file_path: String,
    #[serde(default)]
    pub args: String,
    #[serde(default)]
    pub uid: u32,
}

/// An observed process execution inside a deployment's pod.
///
/// Indicators are consumed by a single runtime detection pass and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIndicator {
    #[serde(default)]
    pub id: String,
    pub deployment_id: DeploymentId,
    pub pod_id: String,
    pub container_name: String,
    pub signal: ProcessSignal,
}

impl ProcessIndicator {
    pub fn new(
        deployment_id: impl Into<String>,
        pod_id: impl Into<String>,
        container_name: impl Into<String>,
        process_name: impl Into<String>,
    ) -> Self {
        let name = process_name.into();
        Self {
            id: String::new(),
            deployment_id: DeploymentId::new(deployment_id),
            pod_id: pod_id.into(),
            container_name: container_name.into(),
            signal: ProcessSignal {
                exec_file_path: name.clone(),
                name,
                args: String::new(),
                uid: 0,
            },
        }
    }
}

/// Set of processes expected to run in one container of a deployment.
///
/// Only locked baselines produce "outside baseline" verdicts; an unlocked
/// baseline is still learning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessBaseline {
    pub deployment_id: DeploymentId,
    pub container_name: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub processes: BTreeSet<String>,
}

impl ProcessBaseline {
    pub fn contains(&self, indicator: &ProcessIndicator) -> bool {
        self.processes.contains(&indicator.signal.exec_file_path)
            || self.processes.contains(&indicator.signal.name)
    }
}
