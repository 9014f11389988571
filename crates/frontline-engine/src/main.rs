//! Engine binary for the Frontline territorial control core.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (path from the first argument, then
//!    `FRONTLINE_CONFIG`, then `frontline-config.yaml`; defaults when the
//!    file does not exist)
//! 2. Initialize structured logging (tracing)
//! 3. Load the territory catalog and wire every component
//! 4. Start the Observer API server
//! 5. Run the background jobs until Ctrl-C
//! 6. Stop the runner and the observer, then log the pass counts

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use frontline_core::{Frontline, FrontlineConfig, LoggingConfig, RunnerControl, run_background};
use frontline_observer::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file used when neither an argument nor `FRONTLINE_CONFIG` names one.
const DEFAULT_CONFIG_PATH: &str = "frontline-config.yaml";

/// Environment variable naming the config file.
const ENV_CONFIG_PATH: &str = "FRONTLINE_CONFIG";

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        path = %config_path.display(),
        world = %config.world.name,
        factions = config.ai.factions.len(),
        "frontline-engine starting"
    );
    if !config_path.exists() {
        info!("config file not found, using defaults");
    }

    // 3. Wire the core.
    let observer_config = config.observer.clone();
    let frontline = Arc::new(Frontline::from_config(config)?);
    info!(
        territories = frontline.graph().len(),
        connections = frontline.routes().connections().len(),
        "territorial control core ready"
    );

    // 4. Start the Observer API server.
    let control = Arc::new(RunnerControl::new());
    let app_state = Arc::new(AppState::new(Arc::clone(&frontline)));
    let observer_stop = Arc::clone(&control);
    let observer = tokio::spawn(async move {
        frontline_observer::start_server(&observer_config, app_state, async move {
            observer_stop.stopped().await;
        })
        .await
    });

    // 5. Run background jobs until Ctrl-C.
    let runner = tokio::spawn(run_background(Arc::clone(&frontline), Arc::clone(&control)));
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    control.request_stop();

    // 6. Drain.
    let summary = runner.await.map_err(|e| EngineError::Task {
        message: format!("background runner: {e}"),
    })?;
    match observer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "observer server failed"),
        Err(e) => error!(error = %e, "observer task failed"),
    }

    info!(
        total_passes = summary.total(),
        last_sequence = frontline.bus().last_sequence(),
        "frontline-engine shutdown complete"
    );
    Ok(())
}

/// Resolve the config path and load it, falling back to defaults (with
/// environment overrides) when the file does not exist.
fn load_config() -> Result<(FrontlineConfig, PathBuf), EngineError> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(ENV_CONFIG_PATH).ok())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        let config = FrontlineConfig::from_file(&path)?;
        Ok((config, path))
    } else {
        let mut config = FrontlineConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok((config, path))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level; `json` switches to the JSON
/// formatter.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level).map_err(|e| EngineError::Logging {
            message: format!("invalid log level '{}': {e}", logging.level),
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
