use async_trait::async_trait;
use kube_sensor::prelude::*;
use parking_lot::Mutex;
use std::time::Duration;

/// Mock EventSink for testing
///
/// Keeps every event and enforcement report in arrival order.
#[derive(Default)]
pub struct MockEventSink {
    events: Mutex<Vec<SensorEvent>>,
    enforcements: Mutex<Vec<SensorEnforcement>>,
}

#[allow(dead_code)]
impl MockEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SensorEvent> {
        self.events.lock().clone()
    }

    pub fn enforcements(&self) -> Vec<SensorEnforcement> {
        self.enforcements.lock().clone()
    }

    /// Alert results sent for one deployment, in arrival order
    pub fn alert_results_for(&self, id: &str) -> Vec<AlertResults> {
        self.events
            .lock()
            .iter()
            .filter_map(SensorEvent::as_alert_results)
            .filter(|results| results.deployment_id.as_str() == id)
            .cloned()
            .collect()
    }

    /// Polls until `condition` holds, failing the test after five seconds
    pub async fn wait_until(&self, condition: impl Fn(&Self) -> bool) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while !condition(self) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "condition not reached; events: {:?}", self.events());
    }
}

#[async_trait]
impl EventSink for MockEventSink {
    async fn send_event(&self, event: SensorEvent) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }

    async fn send_enforcement(&self, enforcement: SensorEnforcement) -> Result<()> {
        self.enforcements.lock().push(enforcement);
        Ok(())
    }
}
