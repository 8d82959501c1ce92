//! Background schedules that keep the world moving.
//!
//! Two independent periodic tasks run beside the HTTP surface:
//!
//! - the **simulation schedule** measures the real time elapsed since its
//!   previous run and feeds it to the tick engine under the write lock;
//! - the **snapshot schedule** encodes the world under the read lock and
//!   hands the bytes to a [`SnapshotSink`] on a blocking thread.
//!
//! Both stop when the shutdown [`watch`] channel flips to `true` or its
//! sender is dropped. Missed periods are delayed, never bursted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stronghold_world::World;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::balance::BalanceLookup;
use crate::config::ScheduleConfig;
use crate::coordinator::SharedWorld;

/// Errors from a single snapshot attempt.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The sink failed to encode or write the snapshot.
    #[error("snapshot failed: {source}")]
    Snapshot {
        /// The sink's own error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The blocking write task panicked or was cancelled.
    #[error("snapshot writer task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// Destination for periodic world snapshots.
///
/// Encoding happens while the caller holds the read lock, so it must not
/// block on I/O. Writing happens afterwards on a blocking thread with no
/// lock held.
pub trait SnapshotSink: Send + Sync + 'static {
    /// Error type returned by the sink.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Serialize the world into the bytes that will be persisted.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the world cannot be encoded.
    fn encode(&self, world: &World) -> Result<Vec<u8>, Self::Error>;

    /// Durably persist previously encoded bytes, returning where they went.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if the bytes could not be persisted.
    fn write_encoded(&self, bytes: Vec<u8>) -> Result<PathBuf, Self::Error>;
}

/// Counters accumulated by [`run_schedules`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Simulation ticks executed.
    pub ticks: u64,
    /// Snapshots successfully written.
    pub snapshots_written: u64,
    /// Snapshot attempts that failed.
    pub snapshot_failures: u64,
}

/// Take one snapshot: encode under the read lock, then write without it.
///
/// # Errors
///
/// Returns [`RunnerError::Snapshot`] if the sink fails, or
/// [`RunnerError::Join`] if the blocking writer task does not complete.
pub async fn snapshot_once<S: SnapshotSink>(
    world: &SharedWorld,
    sink: &Arc<S>,
) -> Result<PathBuf, RunnerError> {
    let bytes = {
        let guard = world.read().await;
        sink.encode(&guard).map_err(boxed)?
    };
    let size = bytes.len();
    let writer = Arc::clone(sink);
    let path = tokio::task::spawn_blocking(move || writer.write_encoded(bytes))
        .await?
        .map_err(boxed)?;
    info!(path = %path.display(), bytes = size, "snapshot written");
    Ok(path)
}

/// Run the simulation schedule until shutdown. Returns the tick count.
///
/// The first tick measures elapsed time from the moment the schedule
/// started, each later tick from the previous one.
pub async fn run_simulation_schedule<B>(
    world: SharedWorld,
    balance: Arc<B>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> u64
where
    B: BalanceLookup + ?Sized + 'static,
{
    let mut interval = tokio::time::interval(non_zero(period));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick completes immediately.
    interval.tick().await;

    let mut ticks: u64 = 0;
    let mut last = Instant::now();
    info!(period_ms = period.as_millis(), "simulation schedule started");

    while !*shutdown.borrow() {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let now = Instant::now();
        let delta = now.duration_since(last).as_secs_f64();
        last = now;

        let report = world.advance(delta, balance.as_ref()).await;
        ticks = ticks.saturating_add(1);
        debug!(
            tick = ticks,
            delta_seconds = report.delta_seconds,
            cities = report.cities,
            upgrades_completed = report.upgrades_completed,
            units_recruited = report.units_recruited,
            "tick complete"
        );
    }

    info!(ticks, "simulation schedule stopped");
    ticks
}

/// Run the snapshot schedule until shutdown. Failures are logged and the
/// schedule keeps going. Returns `(written, failed)`.
pub async fn run_snapshot_schedule<S: SnapshotSink>(
    world: SharedWorld,
    sink: Arc<S>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> (u64, u64) {
    let mut interval = tokio::time::interval(non_zero(period));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    let mut written: u64 = 0;
    let mut failed: u64 = 0;
    info!(period_secs = period.as_secs(), "snapshot schedule started");

    while !*shutdown.borrow() {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        match snapshot_once(&world, &sink).await {
            Ok(_) => written = written.saturating_add(1),
            Err(e) => {
                failed = failed.saturating_add(1);
                error!(error = %e, "periodic snapshot failed");
            }
        }
    }

    info!(written, failed, "snapshot schedule stopped");
    (written, failed)
}

/// Run both schedules concurrently until shutdown.
pub async fn run_schedules<B, S>(
    world: SharedWorld,
    balance: Arc<B>,
    sink: Arc<S>,
    schedule: &ScheduleConfig,
    shutdown: watch::Receiver<bool>,
) -> RunSummary
where
    B: BalanceLookup + ?Sized + 'static,
    S: SnapshotSink,
{
    let simulation = tokio::spawn(run_simulation_schedule(
        world.clone(),
        balance,
        Duration::from_millis(schedule.tick_interval_ms),
        shutdown.clone(),
    ));
    let snapshots = tokio::spawn(run_snapshot_schedule(
        world,
        sink,
        Duration::from_secs(schedule.snapshot_interval_secs),
        shutdown,
    ));

    let mut summary = RunSummary::default();
    match simulation.await {
        Ok(ticks) => summary.ticks = ticks,
        Err(e) => warn!(error = %e, "simulation schedule task failed"),
    }
    match snapshots.await {
        Ok((written, failed)) => {
            summary.snapshots_written = written;
            summary.snapshot_failures = failed;
        }
        Err(e) => warn!(error = %e, "snapshot schedule task failed"),
    }
    summary
}

fn boxed<E: std::error::Error + Send + Sync + 'static>(source: E) -> RunnerError {
    RunnerError::Snapshot {
        source: Box::new(source),
    }
}

fn non_zero(period: Duration) -> Duration {
    period.max(Duration::from_millis(1))
}
