//! Fixed-cadence scheduler loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::task;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::cycle::CycleRunner;
use crate::error::SnapshotError;
use crate::snapshot::SnapshotWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

/// What a finished [`Scheduler::run`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub cycles: u64,
    pub snapshots_written: u64,
    pub snapshot_failures: u64,
}

/// Runs a cycle, writes its snapshot, waits, repeats.
///
/// Cycles never overlap and are never skipped. The wait after a cycle is the
/// interval minus the time the cycle took, clamped at zero, so a slow cycle
/// is followed directly by the next one without any catch-up burst. The stop
/// signal is honoured during the wait; an in-flight cycle always completes.
pub struct Scheduler {
    runner: CycleRunner,
    writer: SnapshotWriter,
    interval: Duration,
    stopped: AtomicBool,
}

impl Scheduler {
    pub fn new(runner: CycleRunner, writer: SnapshotWriter, interval: Duration) -> Self {
        Self { runner, writer, interval, stopped: AtomicBool::new(false) }
    }

    pub fn state(&self) -> SchedulerState {
        if self.stopped.load(Ordering::Acquire) {
            SchedulerState::Stopped
        } else {
            SchedulerState::Running
        }
    }

    /// One cycle plus its snapshot. Metrics are already published when the
    /// snapshot write is attempted, whatever its outcome.
    ///
    /// The write runs on the blocking pool so a current-thread runtime keeps
    /// serving other tasks meanwhile.
    pub async fn run_once(&self, config: &MonitorConfig) -> Result<PathBuf, SnapshotError> {
        let record = self.runner.run_cycle(config).await;
        let writer = self.writer.clone();
        task::spawn_blocking(move || writer.write(&record)).await?
    }

    /// Loop until `shutdown` is cancelled. At least one cycle always runs.
    pub async fn run(&self, config: &MonitorConfig, shutdown: CancellationToken) -> SchedulerSummary {
        let mut summary = SchedulerSummary::default();

        if self.state() == SchedulerState::Stopped {
            warn!("scheduler already stopped, not restarting");
            return summary;
        }

        info!(
            interval_secs = self.interval.as_secs(),
            results_dir = %self.writer.dir().display(),
            "scheduler started"
        );

        loop {
            let started = Instant::now();

            match self.run_once(config).await {
                Ok(_) => summary.snapshots_written += 1,
                Err(e) => {
                    summary.snapshot_failures += 1;
                    error!("failed to write snapshot: {e}");
                }
            }
            summary.cycles += 1;

            let wait = next_wait(self.interval, started.elapsed());
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = sleep(wait) => {}
            }
        }

        self.stopped.store(true, Ordering::Release);
        info!(
            cycles = summary.cycles,
            snapshots = summary.snapshots_written,
            snapshot_failures = summary.snapshot_failures,
            "scheduler stopped"
        );

        summary
    }
}

/// Time left to wait after a cycle that took `elapsed`, never negative.
pub fn next_wait(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}
