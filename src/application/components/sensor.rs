use super::{Detector, Enforcer, OutputQueue};
use crate::application::dto::{MsgToSensor, ResourceEvent};
use crate::detection::domain::ProcessIndicator;
use crate::ports::inbound::DetectionPort;
use crate::shared::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A fully wired sensor pipeline
///
/// Owns the root shutdown token shared by every component.
pub struct Sensor {
    detector: Detector,
    enforcer: Arc<Enforcer>,
    output: Arc<OutputQueue>,
    shutdown: CancellationToken,
}

impl Sensor {
    pub(crate) fn new(
        detector: Detector,
        enforcer: Arc<Enforcer>,
        output: Arc<OutputQueue>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            detector,
            enforcer,
            output,
            shutdown,
        }
    }

    /// Starts the long-lived tasks: enforcement drain, detection serializer
    /// and output drain
    pub fn start(&self) -> Result<()> {
        self.enforcer.start()?;
        self.detector.start()?;
        self.output.start()?;
        info!("Sensor started");
        Ok(())
    }

    /// Cancels the root scope and waits for the long-lived tasks
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.detector.stop().await;
        self.enforcer.stop().await;
        self.output.stop().await;
        info!("Sensor stopped");
    }

    /// A new processing scope, cancelled at the latest on shutdown
    pub fn scope(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Hands a cluster change to the output queue
    pub async fn send(&self, event: ResourceEvent) -> Result<()> {
        self.output.send(event).await
    }

    pub fn process_indicator(&self, indicator: ProcessIndicator) {
        self.detector.process_indicator(self.scope(), indicator);
    }

    pub fn process_message(&self, message: MsgToSensor) -> Result<()> {
        self.detector.process_message(message)
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }
}
