//! netprobe - probe execution and result aggregation for netmon
//!
//! Given a [`MonitorConfig`], netprobe runs ICMP, TCP-connect and HTTP probes
//! against every configured target, publishes each outcome to a
//! [`MetricsSink`] and persists the whole cycle as a JSON snapshot.

pub mod config;
pub mod cycle;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod scheduler;
pub mod snapshot;

pub use config::{IcmpBackend, MonitorConfig, Target};
pub use cycle::{CycleRecord, CycleRunner, ProbeEntry, TargetRecord};
pub use error::{ConfigError, MetricsError, SetupError, SnapshotError};
pub use metrics::{MetricsSink, PrometheusSink};
pub use probe::{Checker, ProbeExecutor, ProbeLabels, ProbeResult, ProbeSpec};
pub use scheduler::{Scheduler, SchedulerState, SchedulerSummary, next_wait};
pub use snapshot::SnapshotWriter;

/// Upper bound on error text carried in metric labels and snapshots.
pub const MAX_ERROR_LEN: usize = 100;
