/// Policy engine adapters
mod rule_policy_engine;

pub use rule_policy_engine::RulePolicyEngine;
