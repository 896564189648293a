use crate::application::dto::{ExpiringMessage, ResourceEvent, SensorEnforcement};
use crate::ports::inbound::DetectionPort;
use crate::ports::outbound::EventSink;
use crate::shared::{Result, SensorError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// OutputQueue - single exit point of the sensor
///
/// Drains three streams into the control-plane sink: resource events from
/// the cluster listener, detector results, and enforcement reports.
/// Resource events are also fed back into detection, after their forwarded
/// messages have been sent, so detection never reports on a resource the
/// control plane has not yet seen.
pub struct OutputQueue {
    events: mpsc::Sender<ResourceEvent>,
    drain: Mutex<Option<Drain>>,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

struct Drain {
    events: mpsc::Receiver<ResourceEvent>,
    detector_results: mpsc::Receiver<ExpiringMessage>,
    enforcements: mpsc::Receiver<SensorEnforcement>,
    detector: Arc<dyn DetectionPort>,
    sink: Arc<dyn EventSink>,
    shutdown: CancellationToken,
}

impl OutputQueue {
    pub fn new(
        queue_capacity: usize,
        detector: Arc<dyn DetectionPort>,
        detector_results: mpsc::Receiver<ExpiringMessage>,
        enforcements: mpsc::Receiver<SensorEnforcement>,
        sink: Arc<dyn EventSink>,
        shutdown: CancellationToken,
    ) -> Self {
        let (events, receiver) = mpsc::channel(queue_capacity);
        let drain = Drain {
            events: receiver,
            detector_results,
            enforcements,
            detector,
            sink,
            shutdown: shutdown.clone(),
        };
        Self {
            events,
            drain: Mutex::new(Some(drain)),
            task: Mutex::new(None),
            shutdown,
        }
    }

    /// Spawns the drain task
    ///
    /// # Errors
    /// Returns [`SensorError::AlreadyStarted`] when called twice.
    pub fn start(&self) -> Result<()> {
        let drain = self
            .drain
            .lock()
            .take()
            .ok_or(SensorError::AlreadyStarted {
                component: "output queue",
            })?;
        *self.task.lock() = Some(tokio::spawn(drain.run()));
        Ok(())
    }

    /// Waits for the drain task to finish; the shared shutdown token must
    /// already be cancelled
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Output queue task ended abnormally");
            }
        }
    }

    /// Enqueues a resource event, waiting while the queue is full.
    ///
    /// # Errors
    /// Returns [`SensorError::ComponentStopped`] once shutdown has begun.
    pub async fn send(&self, event: ResourceEvent) -> Result<()> {
        let stopped = SensorError::ComponentStopped {
            component: "output queue",
            what: "resource event",
        };
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(stopped.into()),
            sent = self.events.send(event) => sent.map_err(|_| stopped.into()),
        }
    }
}

impl Drain {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(event) = self.events.recv() => self.handle_event(event).await,
                Some(message) = self.detector_results.recv() => self.forward(message).await,
                Some(report) = self.enforcements.recv() => {
                    if let Err(e) = self.sink.send_enforcement(report).await {
                        warn!(error = %e, "Failed to send enforcement report");
                    }
                }
                else => break,
            }
        }
        debug!("Output queue stopped");
    }

    async fn handle_event(&self, event: ResourceEvent) {
        if event.context.is_cancelled() {
            debug!(
                forward = event.forward_messages.len(),
                detect = event.detector_messages.len(),
                "Dropping resource event from expired scope"
            );
            return;
        }

        for message in event.forward_messages {
            self.forward(ExpiringMessage::new(message, event.context.clone()))
                .await;
        }

        if !event.reprocess_deployments.is_empty() {
            self.detector
                .reprocess_deployments(&event.reprocess_deployments);
        }

        for message in event.detector_messages {
            self.detector.process_deployment(
                event.context.clone(),
                message.deployment,
                message.action,
            );
        }
    }

    async fn forward(&self, message: ExpiringMessage) {
        if message.is_expired() {
            debug!(id = %message.event.id, "Dropping expired message");
            return;
        }
        if let Err(e) = self.sink.send_event(message.event).await {
            warn!(error = %e, "Failed to send event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::{MsgToSensor, SensorEvent};
    use crate::detection::domain::{
        AlertResults, Deployment, DeploymentId, EnforcementAction, EnforcementTarget,
        LifecycleStage, ProcessIndicator, ResourceAction,
    };
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum Call {
        Reprocess(Vec<DeploymentId>),
        Process(DeploymentId, ResourceAction),
        Sent(String),
        Reported(EnforcementAction),
    }

    /// Records detector and sink calls on one shared timeline
    struct Timeline {
        calls: mpsc::UnboundedSender<Call>,
    }

    impl DetectionPort for Timeline {
        fn process_deployment(
            &self,
            _context: CancellationToken,
            deployment: Deployment,
            action: ResourceAction,
        ) {
            let _ = self.calls.send(Call::Process(deployment.id, action));
        }

        fn reprocess_deployments(&self, ids: &[DeploymentId]) {
            let _ = self.calls.send(Call::Reprocess(ids.to_vec()));
        }

        fn process_indicator(&self, _context: CancellationToken, _indicator: ProcessIndicator) {}

        fn process_message(&self, _message: MsgToSensor) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl EventSink for Timeline {
        async fn send_event(&self, event: SensorEvent) -> Result<()> {
            let _ = self.calls.send(Call::Sent(event.id));
            Ok(())
        }

        async fn send_enforcement(&self, enforcement: SensorEnforcement) -> Result<()> {
            let _ = self.calls.send(Call::Reported(enforcement.action));
            Ok(())
        }
    }

    struct Harness {
        queue: OutputQueue,
        detector_results: mpsc::Sender<ExpiringMessage>,
        enforcements: mpsc::Sender<SensorEnforcement>,
        calls: mpsc::UnboundedReceiver<Call>,
        shutdown: CancellationToken,
    }

    fn harness() -> Harness {
        let (calls_tx, calls) = mpsc::unbounded_channel();
        let timeline = Arc::new(Timeline { calls: calls_tx });
        let (detector_results, detector_rx) = mpsc::channel(8);
        let (enforcements, enforcement_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let queue = OutputQueue::new(
            8,
            timeline.clone(),
            detector_rx,
            enforcement_rx,
            timeline,
            shutdown.clone(),
        );
        queue.start().unwrap();
        Harness {
            queue,
            detector_results,
            enforcements,
            calls,
            shutdown,
        }
    }

    async fn next_call(calls: &mut mpsc::UnboundedReceiver<Call>) -> Call {
        tokio::time::timeout(Duration::from_secs(5), calls.recv())
            .await
            .expect("no call recorded")
            .expect("timeline closed")
    }

    #[tokio::test]
    async fn test_forward_before_reprocess_before_detection() {
        let mut h = harness();
        let mut event = ResourceEvent::for_deployment(
            Deployment::new("d1", "web"),
            ResourceAction::Create,
            CancellationToken::new(),
        );
        event.reprocess_deployments.push(DeploymentId::new("d0"));

        h.queue.send(event).await.unwrap();

        assert_eq!(next_call(&mut h.calls).await, Call::Sent("d1".to_string()));
        assert_eq!(
            next_call(&mut h.calls).await,
            Call::Reprocess(vec![DeploymentId::new("d0")])
        );
        assert_eq!(
            next_call(&mut h.calls).await,
            Call::Process(DeploymentId::new("d1"), ResourceAction::Create)
        );

        h.shutdown.cancel();
        h.queue.stop().await;
    }

    #[tokio::test]
    async fn test_cancelled_event_dropped_whole() {
        let mut h = harness();
        let context = CancellationToken::new();
        context.cancel();

        h.queue
            .send(ResourceEvent::for_deployment(
                Deployment::new("d1", "web"),
                ResourceAction::Update,
                context,
            ))
            .await
            .unwrap();
        h.queue
            .send(ResourceEvent::for_deployment(
                Deployment::new("d2", "api"),
                ResourceAction::Update,
                CancellationToken::new(),
            ))
            .await
            .unwrap();

        // Nothing from d1 precedes d2
        assert_eq!(next_call(&mut h.calls).await, Call::Sent("d2".to_string()));

        h.shutdown.cancel();
        h.queue.stop().await;
    }

    #[tokio::test]
    async fn test_expired_detector_message_dropped() {
        let mut h = harness();
        let expired = CancellationToken::new();
        expired.cancel();
        let event = |id: &str| {
            SensorEvent::alert_results(
                ResourceAction::Update,
                AlertResults::new(DeploymentId::new(id), vec![], LifecycleStage::Deploy),
            )
        };

        h.detector_results
            .send(ExpiringMessage::new(event("stale"), expired))
            .await
            .unwrap();
        h.detector_results
            .send(ExpiringMessage::non_expiring(event("fresh")))
            .await
            .unwrap();

        assert_eq!(next_call(&mut h.calls).await, Call::Sent("fresh".to_string()));

        h.shutdown.cancel();
        h.queue.stop().await;
    }

    #[tokio::test]
    async fn test_enforcement_reports_use_enforcement_stream() {
        let mut h = harness();
        h.enforcements
            .send(SensorEnforcement {
                action: EnforcementAction::KillPod,
                target: EnforcementTarget::ContainerInstance {
                    deployment_id: DeploymentId::new("d1"),
                    pod_id: "pod-1".to_string(),
                    container_name: "app".to_string(),
                    alert_id: "a1".to_string(),
                },
            })
            .await
            .unwrap();

        assert_eq!(
            next_call(&mut h.calls).await,
            Call::Reported(EnforcementAction::KillPod)
        );

        h.shutdown.cancel();
        h.queue.stop().await;
    }

    #[tokio::test]
    async fn test_send_after_shutdown_fails() {
        let h = harness();
        h.shutdown.cancel();
        h.queue.stop().await;

        let err = h
            .queue
            .send(ResourceEvent::new(CancellationToken::new()))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SensorError>(),
            Some(SensorError::ComponentStopped { .. })
        ));
    }
}
