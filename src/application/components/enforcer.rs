use crate::application::dto::SensorEnforcement;
use crate::detection::domain::{
    Alert, AlertResults, EnforcementAction, EnforcementCommand, EnforcementTarget,
    LifecycleStage, ResourceAction,
};
use crate::ports::outbound::EnforcementExecutor;
use crate::shared::{Capability, CapabilityHandle, Result, SensorError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Annotation that exempts a deployment from enforcement
pub const DEFAULT_BYPASS_ANNOTATION: &str = "sensor.security.io/break-glass";

pub const DEFAULT_ENFORCEMENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct EnforcerSettings {
    pub queue_capacity: usize,
    pub action_timeout: Duration,
    pub bypass_annotation: String,
}

impl Default for EnforcerSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            action_timeout: DEFAULT_ENFORCEMENT_TIMEOUT,
            bypass_annotation: DEFAULT_BYPASS_ANNOTATION.to_string(),
        }
    }
}

/// Executors keyed by the enforcement action they carry out
pub type ExecutorRegistry = HashMap<EnforcementAction, Arc<dyn EnforcementExecutor>>;

/// Enforcer - turns enforced alerts into cluster actions
///
/// Commands are queued by [`Enforcer::process_alert_results`] and executed
/// one at a time by a single drain task, so the producer never waits on the
/// cluster API.
pub struct Enforcer {
    settings: EnforcerSettings,
    commands: mpsc::Sender<EnforcementCommand>,
    drain: Mutex<Option<Drain>>,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

/// State moved into the drain task on start
struct Drain {
    receiver: mpsc::Receiver<EnforcementCommand>,
    executors: ExecutorRegistry,
    reports: mpsc::Sender<SensorEnforcement>,
    capabilities: CapabilityHandle,
    action_timeout: Duration,
    shutdown: CancellationToken,
}

impl Enforcer {
    pub fn new(
        settings: EnforcerSettings,
        executors: ExecutorRegistry,
        reports: mpsc::Sender<SensorEnforcement>,
        capabilities: CapabilityHandle,
        shutdown: CancellationToken,
    ) -> Self {
        let (commands, receiver) = mpsc::channel(settings.queue_capacity);
        let drain = Drain {
            receiver,
            executors,
            reports,
            capabilities,
            action_timeout: settings.action_timeout,
            shutdown: shutdown.clone(),
        };
        Self {
            settings,
            commands,
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
                component: "enforcer",
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
                warn!(error = %e, "Enforcer task ended abnormally");
            }
        }
    }

    /// Queues enforcement commands for the enforced alerts of a result.
    ///
    /// Only newly created results are enforced. Returns the number of
    /// commands queued.
    ///
    /// # Errors
    /// Returns [`SensorError::ComponentStopped`] if shutdown prevents a
    /// command from being queued.
    pub async fn process_alert_results(
        &self,
        action: ResourceAction,
        stage: LifecycleStage,
        results: &AlertResults,
    ) -> Result<usize> {
        if action != ResourceAction::Create {
            return Ok(0);
        }

        let mut queued = 0;
        for alert in &results.alerts {
            let Some(command) = self.command_for(stage, alert) else {
                continue;
            };
            self.enqueue(command).await?;
            queued += 1;
        }
        Ok(queued)
    }

    fn command_for(&self, stage: LifecycleStage, alert: &Alert) -> Option<EnforcementCommand> {
        let action = alert.enforcement.filter(|action| action.is_set())?;

        if alert
            .deployment
            .annotations
            .contains_key(&self.settings.bypass_annotation)
        {
            info!(
                deployment = %alert.deployment.name,
                namespace = %alert.deployment.namespace,
                policy = %alert.policy.name,
                "Enforcement bypassed by annotation"
            );
            return None;
        }

        let target = match stage {
            LifecycleStage::Deploy => EnforcementTarget::Deployment {
                deployment_id: alert.deployment.id.clone(),
                deployment_name: alert.deployment.name.clone(),
                namespace: alert.deployment.namespace.clone(),
                alert_id: alert.id.clone(),
            },
            LifecycleStage::Runtime => {
                let processes = alert
                    .process_violation
                    .as_ref()
                    .map(|violation| violation.processes.as_slice())
                    .unwrap_or_default();
                let [process] = processes else {
                    error!(
                        alert_id = %alert.id,
                        processes = processes.len(),
                        "Runtime alert must carry exactly one process; skipping enforcement"
                    );
                    return None;
                };
                EnforcementTarget::ContainerInstance {
                    deployment_id: alert.deployment.id.clone(),
                    pod_id: process.pod_id.clone(),
                    container_name: process.container_name.clone(),
                    alert_id: alert.id.clone(),
                }
            }
        };

        Some(EnforcementCommand { action, target })
    }

    async fn enqueue(&self, command: EnforcementCommand) -> Result<()> {
        let stopped = SensorError::ComponentStopped {
            component: "enforcer",
            what: "enforcement command",
        };
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(stopped.into()),
            sent = self.commands.send(command) => sent.map_err(|_| stopped.into()),
        }
    }
}

impl Drain {
    async fn run(mut self) {
        loop {
            let command = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                command = self.receiver.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            self.execute(command).await;
        }
        debug!("Enforcer drained");
    }

    async fn execute(&self, command: EnforcementCommand) {
        let Some(executor) = self.executors.get(&command.action) else {
            warn!(action = ?command.action, "No executor registered for enforcement action");
            return;
        };

        let run = tokio::time::timeout(self.action_timeout, executor.execute(&command));
        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                debug!(action = ?command.action, "Enforcement abandoned on shutdown");
                return;
            }
            outcome = run => outcome,
        };

        match outcome {
            Ok(Ok(())) => {
                info!(
                    action = ?command.action,
                    deployment = %command.target.deployment_id(),
                    "Enforcement executed"
                );
                self.report(command).await;
            }
            Ok(Err(e)) => {
                error!(action = ?command.action, error = %e, "Enforcement failed");
            }
            Err(_) => {
                error!(
                    action = ?command.action,
                    timeout_secs = self.action_timeout.as_secs(),
                    "Enforcement timed out"
                );
            }
        }
    }

    async fn report(&self, command: EnforcementCommand) {
        if !self
            .capabilities
            .supports(Capability::EnforcementReporting)
        {
            return;
        }
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {}
            sent = self.reports.send(SensorEnforcement::from(command)) => {
                if sent.is_err() {
                    debug!("Enforcement report stream closed");
                }
            }
        }
    }
}
