use crate::application::components::Enforcer;
use crate::application::dto::{ExpiringMessage, SensorEvent};
use crate::detection::domain::{AlertResults, DeploymentId, LifecycleStage, ResourceAction};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of one detection pass, waiting to be ordered
#[derive(Debug)]
pub(super) struct DetectionOutcome {
    pub results: AlertResults,
    /// Logical timestamp of the deployment state the results were computed on
    pub timestamp: i64,
    pub action: ResourceAction,
    pub context: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Acceptance {
    Accepted,
    Stale { latest: i64 },
    /// The deployment was removed since detection started
    Untracked,
}

/// Latest accepted logical timestamp per tracked deployment
#[derive(Debug, Default)]
pub(super) struct ProcessingRecords {
    latest: RwLock<HashMap<DeploymentId, i64>>,
}

impl ProcessingRecords {
    /// Starts tracking a deployment; an existing record is left untouched.
    ///
    /// A removal marker still in flight for the same id deletes the record
    /// later, suppressing results until the next update re-marks it.
    /// Resetting the record here would let stale results overtake newer ones.
    pub fn mark(&self, id: &DeploymentId) {
        self.latest.write().entry(id.clone()).or_insert(0);
    }

    pub fn remove(&self, id: &DeploymentId) {
        self.latest.write().remove(id);
    }

    /// Accepts a result when its timestamp is not older than the newest one
    /// already accepted, recording it as the newest
    pub fn accept(&self, id: &DeploymentId, timestamp: i64) -> Acceptance {
        let mut latest = self.latest.write();
        match latest.get_mut(id) {
            None => Acceptance::Untracked,
            Some(current) if timestamp >= *current => {
                *current = timestamp;
                Acceptance::Accepted
            }
            Some(current) => Acceptance::Stale { latest: *current },
        }
    }

    #[cfg(test)]
    pub fn is_tracked(&self, id: &DeploymentId) -> bool {
        self.latest.read().contains_key(id)
    }
}

/// Single consumer of detection outcomes.
///
/// Runs enforcement for new deployments and forwards only the newest result
/// of every live deployment.
pub(super) struct Serializer {
    pub outcomes: mpsc::Receiver<DetectionOutcome>,
    pub records: Arc<ProcessingRecords>,
    pub enforcer: Arc<Enforcer>,
    pub output: mpsc::Sender<ExpiringMessage>,
    pub shutdown: CancellationToken,
}

impl Serializer {
    pub async fn run(mut self) {
        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                outcome = self.outcomes.recv() => match outcome {
                    Some(outcome) => outcome,
                    None => break,
                },
            };
            self.handle(outcome).await;
        }
        debug!("Detection serializer stopped");
    }

    async fn handle(&self, outcome: DetectionOutcome) {
        match outcome.action {
            ResourceAction::Remove => {
                self.records.remove(&outcome.results.deployment_id);
                self.emit(outcome).await;
            }
            ResourceAction::Create => {
                // Enforcement must not depend on whether a later UPDATE
                // overtakes this result
                if let Err(e) = self
                    .enforcer
                    .process_alert_results(
                        ResourceAction::Create,
                        LifecycleStage::Deploy,
                        &outcome.results,
                    )
                    .await
                {
                    warn!(
                        deployment = %outcome.results.deployment_id,
                        error = %e,
                        "Unable to enforce deploy-time alerts"
                    );
                }
                self.forward_if_newest(outcome).await;
            }
            ResourceAction::Update | ResourceAction::Sync => {
                self.forward_if_newest(outcome).await;
            }
        }
    }

    async fn forward_if_newest(&self, outcome: DetectionOutcome) {
        let id = &outcome.results.deployment_id;
        match self.records.accept(id, outcome.timestamp) {
            Acceptance::Accepted => self.emit(outcome).await,
            Acceptance::Stale { latest } => {
                debug!(
                    deployment = %id,
                    timestamp = outcome.timestamp,
                    latest,
                    "Dropping stale detection result"
                );
            }
            Acceptance::Untracked => {
                debug!(deployment = %id, "Dropping detection result for removed deployment");
            }
        }
    }

    async fn emit(&self, outcome: DetectionOutcome) {
        let event = SensorEvent::alert_results(outcome.action, outcome.results);
        send_output(
            &self.output,
            &self.shutdown,
            ExpiringMessage::new(event, outcome.context),
        )
        .await;
    }
}

/// Hands a message to the output queue, giving up on shutdown
pub(super) async fn send_output(
    output: &mpsc::Sender<ExpiringMessage>,
    shutdown: &CancellationToken,
    message: ExpiringMessage,
) {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => debug!("Detector output dropped on shutdown"),
        sent = output.send(message) => {
            if sent.is_err() {
                debug!("Detector output stream closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_accept_monotonic() {
        let records = ProcessingRecords::default();
        let id = DeploymentId::new("d1");
        records.mark(&id);

        assert_eq!(records.accept(&id, 7), Acceptance::Accepted);
        assert_eq!(records.accept(&id, 3), Acceptance::Stale { latest: 7 });
        assert_eq!(records.accept(&id, 7), Acceptance::Accepted);
        assert_eq!(records.accept(&id, 9), Acceptance::Accepted);
    }

    #[test]
    fn test_mark_keeps_existing_record() {
        let records = ProcessingRecords::default();
        let id = DeploymentId::new("d1");
        records.mark(&id);
        records.accept(&id, 5);
        records.mark(&id);

        assert_eq!(records.accept(&id, 4), Acceptance::Stale { latest: 5 });
    }

    #[test]
    fn test_removed_record_is_untracked() {
        let records = ProcessingRecords::default();
        let id = DeploymentId::new("d1");
        records.mark(&id);
        records.remove(&id);

        assert!(!records.is_tracked(&id));
        assert_eq!(records.accept(&id, 10), Acceptance::Untracked);
    }
}
