use crate::detection::domain::{DeploymentId, Image, ImageReference, Policy, ProcessBaseline};
use crate::shared::Capability;
use serde::{Deserialize, Serialize};

/// Messages the control plane sends to the sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MsgToSensor {
    /// Replace the active policy set
    PolicySync { policies: Vec<Policy> },
    /// Re-run detection for every stored deployment with the current policies
    ReassessPolicies,
    /// Add process baselines
    WhitelistSync { whitelists: Vec<ProcessBaseline> },
    /// Remove specific images from the scan cache
    InvalidateImageCache { image_keys: Vec<ImageReference> },
    /// Re-run detection for one deployment
    ReprocessDeployment { deployment_id: DeploymentId },
    /// Mark every deployment for re-detection on its next update
    ReprocessDeployments,
    /// A fresher scan of an image, pushed by the control plane
    UpdatedImage { image: Image },
    /// Renegotiated set of control plane capabilities
    CentralCapabilities { capabilities: Vec<Capability> },
}

impl MsgToSensor {
    pub fn kind(&self) -> &'static str {
        match self {
            MsgToSensor::PolicySync { .. } => "policy_sync",
            MsgToSensor::ReassessPolicies => "reassess_policies",
            MsgToSensor::WhitelistSync { .. } => "whitelist_sync",
            MsgToSensor::InvalidateImageCache { .. } => "invalidate_image_cache",
            MsgToSensor::ReprocessDeployment { .. } => "reprocess_deployment",
            MsgToSensor::ReprocessDeployments => "reprocess_deployments",
            MsgToSensor::UpdatedImage { .. } => "updated_image",
            MsgToSensor::CentralCapabilities { .. } => "central_capabilities",
        }
    }
}
