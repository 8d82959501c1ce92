//! Server binary for Stronghold.
//!
//! This is the main entry point that wires together the world, the two
//! background schedules, and the game API. It runs until interrupted,
//! then stops every task and writes one final snapshot.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `stronghold-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load the balance catalog and the starting city template
//! 4. Restore the latest snapshot, or start from an empty world
//! 5. Start the simulation and snapshot schedules
//! 6. Start the game API
//! 7. On Ctrl-C: signal shutdown, await tasks, write a final snapshot

mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stronghold_api::state::AppState;
use stronghold_core::balance::BalanceCatalog;
use stronghold_core::commands::StartingCity;
use stronghold_core::config::{LoggingConfig, ServerConfig};
use stronghold_core::coordinator::SharedWorld;
use stronghold_core::runner;
use stronghold_store::SnapshotStore;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Config file used when neither an argument nor `STRONGHOLD_CONFIG` names one.
const DEFAULT_CONFIG_PATH: &str = "stronghold-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any startup step fails, if the API server fails,
/// or if the final snapshot cannot be written.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so the outcome is
    //    reported right after step 2.
    let config_path = resolve_config_path(
        std::env::args().nth(1),
        std::env::var("STRONGHOLD_CONFIG").ok(),
    );
    let config = ServerConfig::load(&config_path).map_err(ServerError::from)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        path = %config_path.display(),
        found = config_path.exists(),
        host = %config.server.host,
        port = config.server.port,
        tick_interval_ms = config.simulation.tick_interval_ms,
        snapshot_interval_secs = config.simulation.snapshot_interval_secs,
        "configuration loaded"
    );

    // 3. Balance catalog and starting city.
    let balance = Arc::new(
        BalanceCatalog::from_file(&config.balance.path).map_err(ServerError::from)?,
    );
    let starting_city = StartingCity::from_config(&config.starting_city, &balance);

    // 4. Restore the world.
    let store = Arc::new(SnapshotStore::from_config(&config.storage));
    let restored = store.load_latest().map_err(ServerError::from)?;
    info!(
        data_dir = %store.data_dir().display(),
        users = restored.user_count(),
        cities = restored.city_count(),
        "world restored"
    );
    let world = SharedWorld::new(restored);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // 5. Background schedules.
    let schedules = {
        let world = world.clone();
        let balance = Arc::clone(&balance);
        let store = Arc::clone(&store);
        let schedule = config.simulation.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            runner::run_schedules(world, balance, store, &schedule, shutdown).await
        })
    };

    // 6. Game API.
    let state = Arc::new(AppState::new(
        world.clone(),
        Arc::clone(&balance),
        starting_city,
        Duration::from_secs(config.sessions.ttl_secs),
        config.sessions.password_cost,
    ));
    let http = config.server.clone();
    let mut api = tokio::spawn(async move {
        stronghold_api::start_server(&http, state, shutdown_rx).await
    });

    // 7. Wait for Ctrl-C, or for the API to stop on its own.
    let early_exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown requested");
            None
        }
        joined = &mut api => Some(joined),
    };

    if shutdown_tx.send(true).is_err() {
        warn!("every task already stopped before shutdown was signalled");
    }
    let served = match early_exit {
        Some(joined) => joined,
        None => api.await,
    };
    if let Ok(Err(e)) = &served {
        error!(error = %e, "game API failed");
    }

    let summary = schedules.await.map_err(ServerError::from)?;
    info!(
        ticks = summary.ticks,
        snapshots_written = summary.snapshots_written,
        snapshot_failures = summary.snapshot_failures,
        "schedules stopped"
    );

    let path = runner::snapshot_once(&world, &store)
        .await
        .map_err(ServerError::from)?;
    info!(path = %path.display(), "final snapshot written");

    served
        .map_err(ServerError::from)?
        .map_err(ServerError::from)?;

    info!("stronghold-server shutdown complete");
    Ok(())
}

/// Pick the config file: the first argument wins over `STRONGHOLD_CONFIG`,
/// which wins over [`DEFAULT_CONFIG_PATH`].
fn resolve_config_path(arg: Option<String>, env: Option<String>) -> PathBuf {
    let given = |path: &String| !path.is_empty();
    arg.filter(given)
        .or_else(|| env.filter(given))
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
