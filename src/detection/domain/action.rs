use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change observed for a cluster resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceAction {
    Create,
    Update,
    Remove,
    /// Re-listing of an existing resource, treated like an update
    Sync,
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceAction::Create => write!(f, "CREATE"),
            ResourceAction::Update => write!(f, "UPDATE"),
            ResourceAction::Remove => write!(f, "REMOVE"),
            ResourceAction::Sync => write!(f, "SYNC"),
        }
    }
}
