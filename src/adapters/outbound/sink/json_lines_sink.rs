use crate::application::dto::{SensorEnforcement, SensorEvent};
use crate::ports::outbound::EventSink;
use crate::shared::Result;
use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One output line; `stream` tells the event and enforcement streams apart
#[derive(Serialize)]
#[serde(tag = "stream", rename_all = "snake_case")]
enum OutputRecord<'a> {
    Event { event: &'a SensorEvent },
    Enforcement { enforcement: &'a SensorEnforcement },
}

/// Counts of what has been written, for the end-of-run summary
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkSummary {
    pub events: usize,
    pub alert_results: usize,
    pub alerts: usize,
    pub enforcements: usize,
}

#[derive(Debug, Default)]
struct SinkCounters {
    events: AtomicUsize,
    alert_results: AtomicUsize,
    alerts: AtomicUsize,
    enforcements: AtomicUsize,
}

/// JsonLinesSink adapter - writes the control-plane streams as JSON lines
///
/// This adapter implements the EventSink port for offline runs: every event
/// and enforcement report becomes one JSON object per line on stdout or in
/// a file.
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn Write + Send>>,
    counters: SinkCounters,
}

impl JsonLinesSink {
    pub fn stdout() -> Self {
        Self::from_writer(Box::new(io::stdout()))
    }

    /// Creates (or truncates) the output file.
    ///
    /// # Errors
    /// Returns an error if the path is a symbolic link or the file cannot
    /// be created.
    pub fn to_file(path: &Path) -> Result<Self> {
        if let Ok(metadata) = fs::symlink_metadata(path) {
            if metadata.is_symlink() {
                anyhow::bail!(
                    "Security: {} is a symbolic link. For security reasons, writing to symbolic links is not allowed.",
                    path.display()
                );
            }
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Self::from_writer(Box::new(BufWriter::new(file))))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            counters: SinkCounters::default(),
        }
    }

    pub fn summary(&self) -> SinkSummary {
        SinkSummary {
            events: self.counters.events.load(Ordering::Relaxed),
            alert_results: self.counters.alert_results.load(Ordering::Relaxed),
            alerts: self.counters.alerts.load(Ordering::Relaxed),
            enforcements: self.counters.enforcements.load(Ordering::Relaxed),
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .flush()
            .map_err(|e| anyhow::anyhow!("Failed to flush output: {}", e))
    }

    fn write_record(&self, record: &OutputRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line).map_err(|e| anyhow::anyhow!("Failed to write output: {}", e))
    }
}

#[async_trait]
impl EventSink for JsonLinesSink {
    async fn send_event(&self, event: SensorEvent) -> Result<()> {
        self.write_record(&OutputRecord::Event { event: &event })?;
        self.counters.events.fetch_add(1, Ordering::Relaxed);
        if let Some(results) = event.as_alert_results() {
            self.counters.alert_results.fetch_add(1, Ordering::Relaxed);
            self.counters
                .alerts
                .fetch_add(results.alerts.len(), Ordering::Relaxed);
        }
        Ok(())
    }

    async fn send_enforcement(&self, enforcement: SensorEnforcement) -> Result<()> {
        self.write_record(&OutputRecord::Enforcement {
            enforcement: &enforcement,
        })?;
        self.counters.enforcements.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::{
        AlertResults, Deployment, DeploymentId, EnforcementAction, EnforcementTarget,
        LifecycleStage, ResourceAction,
    };
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writes_one_line_per_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.jsonl");
        let sink = JsonLinesSink::to_file(&path).unwrap();

        sink.send_event(SensorEvent::deployment(
            ResourceAction::Create,
            Deployment::new("d1", "web"),
        ))
        .await
        .unwrap();
        sink.send_event(SensorEvent::alert_results(
            ResourceAction::Create,
            AlertResults::new(DeploymentId::new("d1"), vec![], LifecycleStage::Deploy),
        ))
        .await
        .unwrap();
        sink.send_enforcement(SensorEnforcement {
            action: EnforcementAction::ScaleToZero,
            target: EnforcementTarget::Deployment {
                deployment_id: DeploymentId::new("d1"),
                deployment_name: "web".to_string(),
                namespace: "prod".to_string(),
                alert_id: "a1".to_string(),
            },
        })
        .await
        .unwrap();
        sink.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["stream"], "event");
        assert_eq!(lines[0]["event"]["resource"]["kind"], "deployment");
        assert_eq!(lines[1]["event"]["resource"]["kind"], "alert_results");
        assert_eq!(lines[2]["stream"], "enforcement");
        assert_eq!(lines[2]["enforcement"]["action"], "SCALE_TO_ZERO");

        assert_eq!(
            sink.summary(),
            SinkSummary {
                events: 2,
                alert_results: 1,
                alerts: 0,
                enforcements: 1,
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_refuses_symlink_output() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target.jsonl");
        let link = temp_dir.path().join("link.jsonl");
        fs::write(&target, "").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let err = JsonLinesSink::to_file(&link).err().unwrap();
        assert!(err.to_string().contains("symbolic link"));
    }
}
