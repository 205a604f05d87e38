//! One pass over every configured target.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{MonitorConfig, Target};
use crate::metrics::MetricsSink;
use crate::probe::{ProbeExecutor, ProbeResult, ProbeSpec};

/// Everything one cycle produced. This is also the snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    /// Seconds since the Unix epoch, captured when the cycle started.
    pub timestamp: f64,
    pub targets: Vec<TargetRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub name: String,
    pub host: String,
    pub probes: Vec<ProbeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeEntry {
    #[serde(flatten)]
    pub spec: ProbeSpec,
    pub result: ProbeResult,
}

impl CycleRecord {
    pub fn new(timestamp: f64) -> Self {
        Self { timestamp, targets: Vec::new() }
    }

    pub fn started_now() -> Self {
        let now = chrono::Utc::now();
        Self::new(now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6)
    }

    /// Whole seconds of [`Self::timestamp`].
    pub fn unix_seconds(&self) -> i64 {
        self.timestamp.floor() as i64
    }

    /// Snapshot file name. Two cycles started in the same second share it.
    pub fn file_name(&self) -> String {
        format!("snapshot_{}.json", self.unix_seconds())
    }

    pub fn probe_count(&self) -> usize {
        self.targets.iter().map(|t| t.probes.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.targets
            .iter()
            .flat_map(|t| &t.probes)
            .filter(|p| !p.result.success)
            .count()
    }
}

impl TargetRecord {
    fn empty(target: &Target) -> Self {
        Self { name: target.name.clone(), host: target.host.clone(), probes: Vec::new() }
    }
}

/// Runs every probe of a configuration and publishes the outcomes.
///
/// With `concurrency == 1` probes run strictly one after another, so a cycle
/// can take up to the sum of all probe timeouts. A higher value keeps that
/// many probes in flight. Either way results are published and recorded in
/// configured order, and the record is only returned once every probe is done.
pub struct CycleRunner {
    executor: ProbeExecutor,
    sink: Arc<dyn MetricsSink>,
    concurrency: usize,
}

impl CycleRunner {
    pub fn new(executor: ProbeExecutor, sink: Arc<dyn MetricsSink>, concurrency: usize) -> Self {
        Self { executor, sink, concurrency: concurrency.max(1) }
    }

    pub async fn run_cycle(&self, config: &MonitorConfig) -> CycleRecord {
        let started = Instant::now();
        let mut record = CycleRecord::started_now();
        record.targets = config.targets.iter().map(TargetRecord::empty).collect();

        info!(
            targets = config.targets.len(),
            probes = config.probe_count(),
            concurrency = self.concurrency,
            "starting probe cycle"
        );

        let executor = &self.executor;
        let jobs = config
            .targets
            .iter()
            .enumerate()
            .flat_map(|(index, target)| {
                target.probes().into_iter().map(move |spec| (index, target, spec))
            });

        // `buffered` yields in input order whatever the completion order.
        let mut outcomes = stream::iter(jobs)
            .map(|(index, target, spec)| async move {
                let result = executor.execute(&target.host, &spec).await;
                (index, target, spec, result)
            })
            .buffered(self.concurrency);

        while let Some((index, target, spec, result)) = outcomes.next().await {
            if !result.success {
                debug!(
                    target_name = %target.name,
                    host = %target.host,
                    probe = %spec,
                    error = result.error.as_deref().unwrap_or(""),
                    "probe failed"
                );
            }
            self.sink.publish(target, &spec, &result);
            record.targets[index].probes.push(ProbeEntry { spec, result });
        }

        info!(
            probes = record.probe_count(),
            failures = record.failure_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "probe cycle finished"
        );

        record
    }
}
