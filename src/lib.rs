//! kube-sensor - runtime security sensor for Kubernetes clusters
//!
//! This library watches deployments and process activity, enriches
//! container images with scan results, evaluates security policies and
//! enforces their verdicts, following hexagonal architecture and
//! Domain-Driven Design principles.
//!
//! # Architecture
//!
//! The library is organized into the following layers:
//!
//! - **Domain Layer** (`detection`): Deployments, images, policies, alerts
//!   and the pure services around them (store, deduper, baselines)
//! - **Application Layer** (`application`): The long-lived pipeline
//!   components (detector, enricher, enforcer, output queue) and their factory
//! - **Ports** (`ports`): Interface definitions for infrastructure
//! - **Adapters** (`adapters`): Concrete implementations of ports
//! - **Shared** (`shared`): Error types, capability negotiation, input checks
//!
//! # Example
//!
//! ```no_run
//! use kube_sensor::prelude::*;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let sink = Arc::new(JsonLinesSink::stdout());
//! let sensor = SensorFactory::build(
//!     &ConfigFile::default().to_settings(),
//!     SensorAdapters {
//!         scanner: Arc::new(UnavailableScanner),
//!         engine: Arc::new(RulePolicyEngine::new()),
//!         sink: sink.clone(),
//!         admission: Arc::new(LoggingAdmissionControl::new()),
//!         executors: HashMap::new(),
//!         capabilities: CapabilitySet::default(),
//!     },
//! );
//! sensor.start()?;
//!
//! let event = ResourceEvent::for_deployment(
//!     Deployment::new("d1", "web"),
//!     ResourceAction::Create,
//!     sensor.scope(),
//! );
//! sensor.send(event).await?;
//!
//! sensor.stop().await;
//! sink.flush()?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod detection;
pub mod ports;
pub mod shared;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::inbound::{load_policies, ReplayReader, ReplayRecord};
    pub use crate::adapters::outbound::cluster::{LoggingAdmissionControl, LoggingExecutor};
    pub use crate::adapters::outbound::policy::RulePolicyEngine;
    pub use crate::adapters::outbound::scanner::{HttpImageScanner, UnavailableScanner};
    pub use crate::adapters::outbound::sink::{JsonLinesSink, SinkSummary};
    pub use crate::application::components::{
        Detector, Enforcer, ImageEnricher, OutputQueue, Sensor,
    };
    pub use crate::application::dto::{
        DedupeMode, ExpiringMessage, MsgToSensor, ResourceEvent, SensorEnforcement, SensorEvent,
    };
    pub use crate::application::factories::{SensorAdapters, SensorFactory, SensorSettings};
    pub use crate::config::ConfigFile;
    pub use crate::detection::domain::{
        AlertResults, Deployment, DeploymentId, EnforcementAction, Image, ImageReference,
        LifecycleStage, Policy, ProcessIndicator, ResourceAction,
    };
    pub use crate::detection::services::{ChangeDeduper, DeploymentStore, NamePattern};
    pub use crate::ports::inbound::DetectionPort;
    pub use crate::ports::outbound::{
        AdmissionControlSettings, EnforcementExecutor, EventSink, ImageScanner, PolicyEngine,
    };
    pub use crate::shared::{Capability, CapabilitySet, Result, SensorError};
}
