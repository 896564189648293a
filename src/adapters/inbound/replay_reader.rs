use crate::application::dto::MsgToSensor;
use crate::detection::domain::{Deployment, DeploymentId, ProcessIndicator, ResourceAction};
use crate::shared::security::read_input_file;
use crate::shared::{Result, SensorError};
use serde::Deserialize;
use std::path::Path;

/// One line of a replay file
///
/// Replays stand in for the cluster listener and the control-plane
/// connection: each record is fed to the sensor in file order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayRecord {
    /// A deployment change observed by the cluster listener
    Deployment {
        action: ResourceAction,
        deployment: Deployment,
        /// Deployments whose dedupe state should be dropped first
        #[serde(default)]
        reprocess: Vec<DeploymentId>,
    },
    /// A process execution observed in a pod
    Indicator { indicator: ProcessIndicator },
    /// A message from the control plane
    Message { message: MsgToSensor },
    /// Pause the replay so in-flight work can settle
    Wait { millis: u64 },
}

/// ReplayReader adapter for JSON-lines replay files
///
/// Blank lines and lines starting with `#` are ignored.
pub struct ReplayReader;

impl ReplayReader {
    /// Reads and parses a whole replay file.
    ///
    /// # Errors
    /// Returns [`SensorError::ReplayParseError`] naming the first malformed
    /// line, or an error if the file cannot be read.
    pub fn read_file(path: &Path) -> Result<Vec<ReplayRecord>> {
        let content = read_input_file(path, "replay file")?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Vec<ReplayRecord>> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let trimmed = line.trim();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            })
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    SensorError::ReplayParseError {
                        path: path.to_path_buf(),
                        line: index + 1,
                        details: e.to_string(),
                    }
                    .into()
                })
            })
            .collect()
    }
}
