use crate::application::components::{
    Detector, DetectorCollaborators, Enforcer, EnforcerSettings, EnricherSettings,
    ExecutorRegistry, ImageEnricher, OutputQueue, Sensor,
};
use crate::application::dto::DedupeMode;
use crate::detection::services::{ChangeDeduper, HashDeduper, PassThroughDeduper};
use crate::ports::outbound::{AdmissionControlSettings, EventSink, ImageScanner, PolicyEngine};
use crate::shared::{CapabilityHandle, CapabilitySet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Tunables of a sensor pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSettings {
    pub max_concurrent_scans: usize,
    pub scan_timeout: Duration,
    pub enforcement_timeout: Duration,
    pub queue_capacity: usize,
    pub dedupe: DedupeMode,
    pub bypass_annotation: String,
}

/// Infrastructure the pipeline talks to
pub struct SensorAdapters {
    pub scanner: Arc<dyn ImageScanner>,
    pub engine: Arc<dyn PolicyEngine>,
    pub sink: Arc<dyn EventSink>,
    pub admission: Arc<dyn AdmissionControlSettings>,
    pub executors: ExecutorRegistry,
    /// Capabilities assumed until the control plane advertises its own
    pub capabilities: CapabilitySet,
}

/// Factory for assembling a sensor pipeline
///
/// Creates the internal queues and hands every component the same root
/// shutdown token and capability handle.
pub struct SensorFactory;

impl SensorFactory {
    pub fn build(settings: &SensorSettings, adapters: SensorAdapters) -> Sensor {
        let shutdown = CancellationToken::new();
        let capabilities = CapabilityHandle::new(adapters.capabilities);

        let (detector_tx, detector_rx) = mpsc::channel(settings.queue_capacity);
        let (reports_tx, reports_rx) = mpsc::channel(settings.queue_capacity);

        let enforcer = Arc::new(Enforcer::new(
            EnforcerSettings {
                queue_capacity: settings.queue_capacity,
                action_timeout: settings.enforcement_timeout,
                bypass_annotation: settings.bypass_annotation.clone(),
            },
            adapters.executors,
            reports_tx,
            capabilities.clone(),
            shutdown.clone(),
        ));

        let enricher = Arc::new(ImageEnricher::new(
            adapters.scanner,
            EnricherSettings {
                max_concurrent_scans: settings.max_concurrent_scans,
                scan_timeout: settings.scan_timeout,
            },
            capabilities.clone(),
            shutdown.clone(),
        ));

        let detector = Detector::new(
            DetectorCollaborators {
                deduper: Self::create_deduper(settings.dedupe),
                enricher,
                engine: adapters.engine,
                admission: adapters.admission,
                enforcer: enforcer.clone(),
                capabilities,
            },
            settings.queue_capacity,
            detector_tx,
            shutdown.clone(),
        );

        let output = Arc::new(OutputQueue::new(
            settings.queue_capacity,
            Arc::new(detector.clone()),
            detector_rx,
            reports_rx,
            adapters.sink,
            shutdown.clone(),
        ));

        Sensor::new(detector, enforcer, output, shutdown)
    }

    /// Creates the deduper for the configured mode
    pub fn create_deduper(mode: DedupeMode) -> Arc<dyn ChangeDeduper> {
        match mode {
            DedupeMode::Hash => Arc::new(HashDeduper::new()),
            DedupeMode::None => Arc::new(PassThroughDeduper),
        }
    }
}
