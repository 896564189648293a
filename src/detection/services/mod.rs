mod baseline;
mod deduper;
mod deployment_store;
mod name_pattern;

pub use baseline::ProcessBaselineEvaluator;
pub use deduper::{ChangeDeduper, HashDeduper, PassThroughDeduper};
pub use deployment_store::DeploymentStore;
pub use name_pattern::NamePattern;
