use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// NewType wrapper for a deployment identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(String);

impl DeploymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeploymentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Reference from a container to the image it runs.
///
/// `id` is the content digest and may be empty when the orchestrator has not
/// resolved it yet. `full_name` is the human-readable name the container used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    #[serde(default)]
    pub id: String,
    pub full_name: String,
}

impl ImageReference {
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub image: ImageReference,
    #[serde(default)]
    pub privileged: bool,
}

impl Container {
    pub fn new(name: impl Into<String>, image: ImageReference) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            image,
            privileged: false,
        }
    }
}

/// A workload tracked for security evaluation.
///
/// `state_timestamp` is the logical clock of the deployment: every observed
/// state change increments it, and detection results are ordered by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub service_account: String,
    #[serde(default)]
    pub replicas: i64,
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Status-only field, not security relevant
    #[serde(default)]
    pub ready_replicas: i64,
    #[serde(default)]
    pub state_timestamp: i64,
}

impl Deployment {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DeploymentId::new(id),
            name: name.into(),
            namespace: String::new(),
            kind: "Deployment".to_string(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            service_account: String::new(),
            replicas: 1,
            containers: Vec::new(),
            ready_replicas: 0,
            state_timestamp: 0,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_state_timestamp(mut self, state_timestamp: i64) -> Self {
        self.state_timestamp = state_timestamp;
        self
    }
}
