use serde::{Deserialize, Serialize};

/// Strategy used to skip re-detection of unchanged deployments
///
/// Shared by the configuration file and the CLI summary; the sensor factory
/// maps it to a concrete deduper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupeMode {
    /// Skip updates whose security-relevant content hash is unchanged (default)
    #[default]
    Hash,
    /// Re-run detection on every update
    None,
}

impl std::str::FromStr for DedupeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hash" => Ok(DedupeMode::Hash),
            "none" | "off" => Ok(DedupeMode::None),
            _ => Err(format!(
                "Invalid dedupe mode: {}. Please specify 'hash' or 'none'",
                s
            )),
        }
    }
}

impl std::fmt::Display for DedupeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupeMode::Hash => write!(f, "hash"),
            DedupeMode::None => write!(f, "none"),
        }
    }
}
