mod cli;

use cli::Args;
use kube_sensor::adapters::inbound::{load_policies, ReplayReader, ReplayRecord};
use kube_sensor::adapters::outbound::cluster::{LoggingAdmissionControl, LoggingExecutor};
use kube_sensor::adapters::outbound::policy::RulePolicyEngine;
use kube_sensor::adapters::outbound::scanner::{HttpImageScanner, UnavailableScanner};
use kube_sensor::adapters::outbound::sink::{JsonLinesSink, SinkSummary};
use kube_sensor::application::components::{ExecutorRegistry, Sensor};
use kube_sensor::application::dto::{MsgToSensor, ResourceEvent};
use kube_sensor::application::factories::{SensorAdapters, SensorFactory};
use kube_sensor::config::{self, ConfigFile};
use kube_sensor::detection::domain::EnforcementAction;
use kube_sensor::ports::outbound::{EnforcementExecutor, ImageScanner};
use kube_sensor::shared::{Capability, CapabilitySet, ExitCode, Result};
use owo_colors::OwoColorize;
use std::collections::HashMap;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = match Args::try_parse_args() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version are not errors
            if e.use_stderr() {
                let _ = e.print();
                process::exit(ExitCode::InvalidArguments.as_i32());
            }
            let _ = e.print();
            process::exit(ExitCode::Success.as_i32());
        }
    };

    init_tracing(args.log_level.as_deref());

    match run(args).await {
        Ok(summary) => {
            print_summary(&summary);
            process::exit(ExitCode::Success.as_i32());
        }
        Err(e) => {
            eprintln!("\n❌ An error occurred:\n");
            eprintln!("{}", e);

            // Display error chain
            let mut source = e.source();
            while let Some(err) = source {
                eprintln!("\nCaused by: {}", err);
                source = err.source();
            }

            eprintln!();
            process::exit(ExitCode::ApplicationError.as_i32());
        }
    }
}

/// Logs go to stderr so stdout carries only the JSON-lines streams
fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(args: Args) -> Result<SinkSummary> {
    let config = match args.config.as_deref() {
        Some(path) => config::load_config_from_path(path)?,
        None => config::discover_config(&std::env::current_dir()?)?.unwrap_or_default(),
    };
    let settings = config.to_settings();
    debug!(?settings, "Resolved sensor settings");

    let records = ReplayReader::read_file(&args.events)?;
    let policies = args.policies.as_deref().map(load_policies).transpose()?;

    let sink = Arc::new(match args.output.as_deref() {
        Some(path) => JsonLinesSink::to_file(path)?,
        None => JsonLinesSink::stdout(),
    });
    let (scanner, capabilities) = create_scanner(&config)?;

    let sensor = SensorFactory::build(
        &settings,
        SensorAdapters {
            scanner,
            engine: Arc::new(RulePolicyEngine::new()),
            sink: sink.clone(),
            admission: Arc::new(LoggingAdmissionControl::new()),
            executors: create_executors(),
            capabilities,
        },
    );
    sensor.start()?;

    if let Some(policies) = policies {
        info!(count = policies.len(), "Applying initial policy set");
        sensor.process_message(MsgToSensor::PolicySync { policies })?;
    }

    let replayed = replay(&sensor, records).await;
    if replayed.is_ok() {
        tokio::time::sleep(Duration::from_millis(args.settle_ms)).await;
    }

    sensor.stop().await;
    sink.flush()?;
    replayed?;

    Ok(sink.summary())
}

async fn replay(sensor: &Sensor, records: Vec<ReplayRecord>) -> Result<()> {
    for record in records {
        match record {
            ReplayRecord::Deployment {
                action,
                deployment,
                reprocess,
            } => {
                let mut event = ResourceEvent::for_deployment(deployment, action, sensor.scope());
                event.reprocess_deployments = reprocess;
                sensor.send(event).await?;
            }
            ReplayRecord::Indicator { indicator } => sensor.process_indicator(indicator),
            ReplayRecord::Message { message } => sensor.process_message(message)?,
            ReplayRecord::Wait { millis } => {
                tokio::time::sleep(Duration::from_millis(millis)).await
            }
        }
    }
    Ok(())
}

/// Without a scan service the sensor cannot scan images, so that capability
/// is not assumed until the control plane advertises it.
fn create_scanner(config: &ConfigFile) -> Result<(Arc<dyn ImageScanner>, CapabilitySet)> {
    let Some(endpoint) = config.scanner_endpoint() else {
        let scanner: Arc<dyn ImageScanner> = Arc::new(UnavailableScanner);
        return Ok((scanner, CapabilitySet::new([Capability::EnforcementReporting])));
    };
    let scanner: Arc<dyn ImageScanner> = Arc::new(HttpImageScanner::new(endpoint)?);
    Ok((scanner, CapabilitySet::all()))
}

fn create_executors() -> ExecutorRegistry {
    let executor: Arc<dyn EnforcementExecutor> = Arc::new(LoggingExecutor::new());
    let mut executors = HashMap::new();
    for action in [
        EnforcementAction::ScaleToZero,
        EnforcementAction::UnsatisfiableNodeConstraint,
        EnforcementAction::KillPod,
        EnforcementAction::FailKubeRequest,
    ] {
        executors.insert(action, executor.clone());
    }
    executors
}

fn print_summary(summary: &SinkSummary) {
    eprintln!();
    eprintln!("{}", "✅ Replay complete".green().bold());
    eprintln!("   Events sent:          {}", summary.events);
    eprintln!("   Alert results:        {}", summary.alert_results);
    if summary.alerts > 0 {
        eprintln!("   Alerts:               {}", summary.alerts.to_string().yellow().bold());
    } else {
        eprintln!("   Alerts:               {}", summary.alerts);
    }
    eprintln!("   Enforcement reports:  {}", summary.enforcements);
}
