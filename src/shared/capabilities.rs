use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Optional behaviours the control plane advertises support for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// The control plane can scan images on the sensor's behalf
    ImageScanning,
    /// The control plane accepts reports of executed enforcement actions
    EnforcementReporting,
}

/// Immutable set of advertised capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self(capabilities.into_iter().collect())
    }

    pub fn all() -> Self {
        Self::new([Capability::ImageScanning, Capability::EnforcementReporting])
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }
}

/// Shared handle to the current capability set.
///
/// Components read snapshots; the set is only replaced through [`update`],
/// when the control plane renegotiates.
///
/// [`update`]: CapabilityHandle::update
#[derive(Debug, Clone, Default)]
pub struct CapabilityHandle {
    current: Arc<RwLock<Arc<CapabilitySet>>>,
}

impl CapabilityHandle {
    pub fn new(initial: CapabilitySet) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    pub fn snapshot(&self) -> Arc<CapabilitySet> {
        self.current.read().clone()
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.current.read().contains(capability)
    }

    pub fn update(&self, capabilities: CapabilitySet) {
        *self.current.write() = Arc::new(capabilities);
    }
}
