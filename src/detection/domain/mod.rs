pub mod action;
pub mod alert;
pub mod deployment;
pub mod enforcement;
pub mod image;
pub mod policy;
pub mod process;

pub use action::ResourceAction;
pub use alert::{
    Alert, AlertDeployment, AlertResults, EnforcementAction, LifecycleStage, PolicyRef,
    ProcessViolation, ViolationState,
};
pub use deployment::{Container, Deployment, DeploymentId, ImageReference};
pub use enforcement::{EnforcementCommand, EnforcementTarget};
pub use image::{Image, ImageCacheKey, ImageComponent, ImageScan, Severity, Vulnerability};
pub use policy::{Policy, PolicyCriteria};
pub use process::{ProcessBaseline, ProcessIndicator, ProcessSignal};
