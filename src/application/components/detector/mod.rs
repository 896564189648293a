mod serializer;

use self::serializer::{send_output, DetectionOutcome, ProcessingRecords, Serializer};
use crate::application::components::{Enforcer, ImageEnricher};
use crate::application::dto::{ExpiringMessage, MsgToSensor, SensorEvent};
use crate::detection::domain::{
    AlertResults, Deployment, DeploymentId, LifecycleStage, Policy, ProcessIndicator,
    ResourceAction,
};
use crate::detection::services::{
    ChangeDeduper, DeploymentStore, NamePattern, ProcessBaselineEvaluator,
};
use crate::ports::inbound::DetectionPort;
use crate::ports::outbound::{AdmissionControlSettings, PolicyEngine};
use crate::shared::{CapabilityHandle, CapabilitySet, Result, SensorError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Components the detector drives
pub struct DetectorCollaborators {
    pub deduper: Arc<dyn ChangeDeduper>,
    pub enricher: Arc<ImageEnricher>,
    pub engine: Arc<dyn PolicyEngine>,
    pub admission: Arc<dyn AdmissionControlSettings>,
    pub enforcer: Arc<Enforcer>,
    pub capabilities: CapabilityHandle,
}

/// Detector - the deploy-time and runtime detection pipeline
///
/// Deployment changes are tracked in the store, filtered by the deduper,
/// enriched with image scans and evaluated against the active policies in
/// spawned tasks. A single serialization stage orders the results so that
/// only the newest result of a live deployment reaches the output stream.
///
/// Cloning yields another handle to the same detector.
#[derive(Clone)]
pub struct Detector {
    inner: Arc<DetectorInner>,
}

struct DetectorInner {
    store: DeploymentStore,
    baselines: ProcessBaselineEvaluator,
    deduper: Arc<dyn ChangeDeduper>,
    enricher: Arc<ImageEnricher>,
    engine: Arc<dyn PolicyEngine>,
    admission: Arc<dyn AdmissionControlSettings>,
    enforcer: Arc<Enforcer>,
    capabilities: CapabilityHandle,
    records: Arc<ProcessingRecords>,
    outcomes: mpsc::Sender<DetectionOutcome>,
    output: mpsc::Sender<ExpiringMessage>,
    serializer: Mutex<Option<Serializer>>,
    task: Mutex<Option<JoinHandle<()>>>,
    /// Serializes store, deduper and record decisions; never held across an await
    decisions: Mutex<()>,
    admission_flush_pending: AtomicBool,
    shutdown: CancellationToken,
}

impl Detector {
    /// Creates a detector whose results are sent on `output`
    pub fn new(
        collaborators: DetectorCollaborators,
        queue_capacity: usize,
        output: mpsc::Sender<ExpiringMessage>,
        shutdown: CancellationToken,
    ) -> Self {
        let (outcomes, receiver) = mpsc::channel(queue_capacity);
        let records = Arc::new(ProcessingRecords::default());
        let serializer = Serializer {
            outcomes: receiver,
            records: records.clone(),
            enforcer: collaborators.enforcer.clone(),
            output: output.clone(),
            shutdown: shutdown.clone(),
        };

        Self {
            inner: Arc::new(DetectorInner {
                store: DeploymentStore::new(),
                baselines: ProcessBaselineEvaluator::new(),
                deduper: collaborators.deduper,
                enricher: collaborators.enricher,
                engine: collaborators.engine,
                admission: collaborators.admission,
                enforcer: collaborators.enforcer,
                capabilities: collaborators.capabilities,
                records,
                outcomes,
                output,
                serializer: Mutex::new(Some(serializer)),
                task: Mutex::new(None),
                decisions: Mutex::new(()),
                admission_flush_pending: AtomicBool::new(false),
                shutdown,
            }),
        }
    }

    /// Spawns the serialization stage
    ///
    /// # Errors
    /// Returns [`SensorError::AlreadyStarted`] when called twice.
    pub fn start(&self) -> Result<()> {
        let serializer = self
            .inner
            .serializer
            .lock()
            .take()
            .ok_or(SensorError::AlreadyStarted {
                component: "detector",
            })?;
        *self.inner.task.lock() = Some(tokio::spawn(serializer.run()));
        Ok(())
    }

    /// Fails pending scans fast and waits for the serialization stage; the
    /// shared shutdown token must already be cancelled
    pub async fn stop(&self) {
        self.inner.enricher.stop();
        let task = self.inner.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Detection serializer ended abnormally");
            }
        }
    }

    /// Snapshot of a tracked deployment
    pub fn deployment(&self, id: &DeploymentId) -> Option<Deployment> {
        self.inner.store.get(id)
    }

    pub fn tracked_deployments(&self) -> usize {
        self.inner.store.len()
    }
}

impl DetectionPort for Detector {
    fn process_deployment(
        &self,
        context: CancellationToken,
        deployment: Deployment,
        action: ResourceAction,
    ) {
        if context.is_cancelled() {
            debug!(deployment = %deployment.id, %action, "Skipping deployment from expired scope");
            return;
        }
        let _decision = self.inner.decisions.lock();
        self.inner.apply(context, deployment, action);
    }

    fn reprocess_deployments(&self, ids: &[DeploymentId]) {
        let _decision = self.inner.decisions.lock();
        for id in ids {
            self.inner.deduper.remove_deployment(id);
        }
    }

    fn process_indicator(&self, context: CancellationToken, indicator: ProcessIndicator) {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.detect_process(context, indicator).await });
    }

    fn process_message(&self, message: MsgToSensor) -> Result<()> {
        debug!(kind = message.kind(), "Processing control-plane message");
        let inner = &self.inner;
        match message {
            MsgToSensor::PolicySync { policies } => inner.sync_policies(&policies)?,
            MsgToSensor::ReassessPolicies => {
                inner.enricher.remove_all();
                inner.admission.flush_cache();
                let _decision = inner.decisions.lock();
                inner.deduper.reset();
                inner.reprocess_all();
            }
            MsgToSensor::WhitelistSync { whitelists } => {
                for baseline in whitelists {
                    inner.baselines.add_baseline(baseline);
                }
            }
            MsgToSensor::InvalidateImageCache { image_keys } => {
                inner.enricher.invalidate(&image_keys);
            }
            MsgToSensor::ReprocessDeployment { deployment_id } => {
                let _decision = inner.decisions.lock();
                inner.deduper.remove_deployment(&deployment_id);
                if let Some(deployment) = inner.store.get(&deployment_id) {
                    inner.apply(
                        inner.shutdown.child_token(),
                        deployment,
                        ResourceAction::Update,
                    );
                }
            }
            MsgToSensor::ReprocessDeployments => {
                if inner.admission_flush_pending.swap(false, Ordering::AcqRel) {
                    inner.admission.flush_cache();
                }
                let _decision = inner.decisions.lock();
                inner.deduper.reset();
            }
            MsgToSensor::UpdatedImage { image } => {
                inner.enricher.update_image(image);
                inner.admission_flush_pending.store(true, Ordering::Release);
            }
            MsgToSensor::CentralCapabilities { capabilities } => {
                info!(?capabilities, "Control plane capabilities updated");
                inner.capabilities.update(CapabilitySet::new(capabilities));
            }
        }
        Ok(())
    }
}

impl DetectorInner {
    /// Applies one deployment change; callers hold the decision lock
    fn apply(self: &Arc<Self>, context: CancellationToken, deployment: Deployment, action: ResourceAction) {
        match action {
            ResourceAction::Create => {
                self.store.upsert(deployment.clone());
                self.deduper.add_deployment(&deployment);
                self.records.mark(&deployment.id);
                self.spawn_detection(context, deployment, action);
            }
            ResourceAction::Update | ResourceAction::Sync => {
                self.store.upsert(deployment.clone());
                if !self.deduper.needs_processing(&deployment) {
                    debug!(deployment = %deployment.id, "Deployment unchanged, skipping detection");
                    return;
                }
                self.records.mark(&deployment.id);
                self.spawn_detection(context, deployment, action);
            }
            ResourceAction::Remove => {
                self.store.remove(&deployment.id);
                self.baselines.remove_deployment(&deployment.id);
                self.deduper.remove_deployment(&deployment.id);
                self.spawn_removal(context, deployment.id);
            }
        }
    }

    /// Re-runs every tracked deployment as an update; callers hold the
    /// decision lock
    fn reprocess_all(self: &Arc<Self>) {
        let deployments = self.store.get_all();
        debug!(count = deployments.len(), "Reprocessing all deployments");
        for deployment in deployments {
            self.apply(self.shutdown.child_token(), deployment, ResourceAction::Update);
        }
    }

    fn spawn_detection(
        self: &Arc<Self>,
        context: CancellationToken,
        deployment: Deployment,
        action: ResourceAction,
    ) {
        let inner = self.clone();
        tokio::spawn(async move {
            let images = inner.enricher.enrich(&deployment).await;
            let alerts = inner.engine.detect_deployment(&deployment, &images);
            let outcome = DetectionOutcome {
                results: AlertResults::new(deployment.id.clone(), alerts, LifecycleStage::Deploy),
                timestamp: deployment.state_timestamp,
                action,
                context,
            };
            inner.submit(outcome).await;
        });
    }

    fn spawn_removal(self: &Arc<Self>, context: CancellationToken, id: DeploymentId) {
        let inner = self.clone();
        tokio::spawn(async move {
            let outcome = DetectionOutcome {
                results: AlertResults::removal_marker(id),
                timestamp: 0,
                action: ResourceAction::Remove,
                context,
            };
            inner.submit(outcome).await;
        });
    }

    async fn submit(&self, outcome: DetectionOutcome) {
        let id = outcome.results.deployment_id.clone();
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                debug!(deployment = %id, "Detection result dropped on shutdown");
            }
            sent = self.outcomes.send(outcome) => {
                if sent.is_err() {
                    debug!("Detection serializer is gone");
                }
            }
        }
    }

    async fn detect_process(&self, context: CancellationToken, indicator: ProcessIndicator) {
        let Some(deployment) = self.store.get(&indicator.deployment_id) else {
            debug!(
                deployment = %indicator.deployment_id,
                process = %indicator.signal.name,
                "Dropping indicator for unknown deployment"
            );
            return;
        };

        let images = self.enricher.cached_images(&deployment);
        let outside_baseline = self.baselines.is_outside_locked_baseline(&indicator);
        let alerts = self
            .engine
            .detect_process(&deployment, &images, &indicator, outside_baseline);
        if alerts.is_empty() {
            return;
        }

        let results = AlertResults::new(deployment.id.clone(), alerts, LifecycleStage::Runtime);
        if let Err(e) = self
            .enforcer
            .process_alert_results(ResourceAction::Create, LifecycleStage::Runtime, &results)
            .await
        {
            warn!(deployment = %deployment.id, error = %e, "Unable to enforce runtime alerts");
        }

        let event = SensorEvent::alert_results(ResourceAction::Create, results);
        send_output(
            &self.output,
            &self.shutdown,
            ExpiringMessage::new(event, context),
        )
        .await;
    }

    fn sync_policies(self: &Arc<Self>, policies: &[Policy]) -> Result<()> {
        validate_policies(policies)?;
        info!(count = policies.len(), "Synchronizing policies");

        self.engine.reconcile_policies(policies);
        {
            let _decision = self.decisions.lock();
            self.deduper.reset();
            self.reprocess_all();
        }
        self.admission.update_policies(policies);
        Ok(())
    }
}

/// Rejects a policy set the engine could not apply consistently
fn validate_policies(policies: &[Policy]) -> Result<()> {
    let mut seen = HashSet::new();
    for policy in policies {
        if policy.id.trim().is_empty() {
            return Err(SensorError::InvalidPolicy {
                reason: format!("policy '{}' has an empty id", policy.name),
            }
            .into());
        }
        if !seen.insert(policy.id.as_str()) {
            return Err(SensorError::InvalidPolicy {
                reason: format!("duplicate policy id '{}'", policy.id),
            }
            .into());
        }
        if policy.lifecycle_stages.is_empty() {
            return Err(SensorError::InvalidPolicy {
                reason: format!("policy '{}' has no lifecycle stage", policy.id),
            }
            .into());
        }
        let criteria = &policy.criteria;
        for pattern in criteria
            .image_name_patterns
            .iter()
            .chain(&criteria.process_name_patterns)
        {
            if let Err(e) = NamePattern::new(pattern) {
                return Err(SensorError::InvalidPolicy {
                    reason: format!("policy '{}': {e}", policy.id),
                }
                .into());
            }
        }
    }
    Ok(())
}
