//! Standalone host for the Wayfarer agent engine.
//!
//! The runner loads a scenario into an in-memory world, drives every agent
//! from a fixed-rate tick loop, and carries their decision prompts to an
//! LLM oracle over HTTP.
//!
//! # Architecture
//!
//! ```text
//! tick loop --> agents --> DecisionRequest --> Dispatcher --> OracleClient --> LLM
//!     ^                                                                        |
//!     +------------------------- DecisionResponse <----------------------------+
//! ```
//!
//! An agent waiting on the oracle stands still; the loop never blocks on a
//! call. Failed or timed-out calls fall back to a roam near home.

mod config;
mod dispatch;
mod error;
mod llm;
mod oracle;
mod runner;
mod scenario;
mod world;

use std::path::Path;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wayfarer_core::{BehaviorConfig, PromptEncoder};

use crate::config::{LogFormat, RunnerConfig, log_format_from_env};
use crate::dispatch::Dispatcher;
use crate::llm::create_backend;
use crate::oracle::OracleClient;
use crate::scenario::Scenario;
use crate::world::Simulation;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// builds the world from the scenario file, then runs the tick loop until
/// Ctrl-C.
///
/// # Errors
///
/// Returns an error if initialization or the tick loop fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(log_format_from_env());

    info!("wayfarer-runner starting");

    // Load configuration from environment
    let config = RunnerConfig::from_env()?;
    info!(
        backend = ?config.oracle.backend_type,
        model = config.oracle.model,
        secondary_key = config.oracle.secondary_api_key.is_some(),
        decision_timeout_ms = config.decision_timeout.as_millis(),
        tick_rate_hz = config.tick_rate_hz,
        log_format = ?config.log_format,
        "configuration loaded"
    );

    // Behavior tuning
    let behavior = match &config.behavior_config_path {
        Some(path) => {
            let behavior = BehaviorConfig::from_file(Path::new(path))?;
            info!(path, "behavior config loaded");
            behavior
        }
        None => {
            info!("no BEHAVIOR_CONFIG_PATH set, using default behavior");
            BehaviorConfig::default()
        }
    };

    // Prompt templates
    let encoder = match &config.templates_dir {
        Some(dir) => {
            let encoder = PromptEncoder::with_overrides(behavior.prompt.clone(), Path::new(dir))?;
            info!(templates_dir = dir, "prompt template overrides loaded");
            encoder
        }
        None => PromptEncoder::new(behavior.prompt.clone())?,
    };

    // World and agents
    let scenario = Scenario::load(Path::new(&config.scenario_path))?;
    let mut rng = StdRng::from_os_rng();
    let population = scenario.populate(&behavior, std::time::Duration::ZERO, &mut rng);
    if population.humanoids.is_empty() {
        warn!(
            scenario = config.scenario_path,
            "scenario has no character with a persona, nothing will consult the oracle"
        );
    }

    // A scenario locale is read from the world by each agent and wins over this.
    let locale = config
        .locale
        .clone()
        .unwrap_or_else(|| behavior.prompt.locale.clone());
    let sim = Simulation::new(
        population.world,
        population.humanoids,
        population.animals,
        encoder,
        locale,
        rng,
    );

    // Oracle
    let backend = create_backend(&config.oracle);
    info!(backend = backend.name(), model = config.oracle.model, "oracle backend configured");
    let oracle = Arc::new(OracleClient::new(
        backend,
        config.oracle.api_key.clone(),
        config.oracle.secondary_api_key.clone(),
    ));
    let timeout = config.dispatch_timeout(behavior.agent.decision_deadline());
    if timeout < config.decision_timeout {
        warn!(
            requested_ms = config.decision_timeout.as_millis(),
            effective_ms = timeout.as_millis(),
            decision_deadline_ms = behavior.agent.decision_deadline_ms,
            "DECISION_TIMEOUT_MS exceeds the agent decision deadline, clamping"
        );
    }
    let (dispatcher, responses) = Dispatcher::new(oracle, timeout);

    info!("simulation initialized, entering tick loop");
    let sim = runner::run(sim, dispatcher, responses, config.tick_period(), shutdown_signal()).await?;
    info!(
        ticks = sim.clock().tick(),
        sim_time_ms = sim.clock().now().as_millis(),
        "wayfarer-runner stopped"
    );

    Ok(())
}

/// Install the global `tracing` subscriber.
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed the loop runs until
/// the process is killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
