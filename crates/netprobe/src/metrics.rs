//! Metrics sink for probe latencies.
//!
//! The cycle runner only talks to [`MetricsSink`]; [`PrometheusSink`] is the
//! production implementation and owns its own registry so several monitors
//! (or tests) can live in one process.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::config::Target;
use crate::error::MetricsError;
use crate::probe::{ProbeResult, ProbeSpec};

pub const ICMP_LATENCY: &str = "network_icmp_latency_ms";
pub const TCP_LATENCY: &str = "network_tcp_connect_latency_ms";
pub const HTTP_LATENCY: &str = "network_http_latency_ms";

/// Content type of [`PrometheusSink::encode`] output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Receives every probe outcome of a cycle.
///
/// Publishing must be safe from several tasks at once. Each
/// (target, port-or-url) key is written at most once per cycle, so plain
/// last-write-wins is enough.
pub trait MetricsSink: Send + Sync {
    fn publish(&self, target: &Target, spec: &ProbeSpec, result: &ProbeResult);
}

/// Latency gauges in a dedicated Prometheus registry.
pub struct PrometheusSink {
    registry: Registry,
    icmp: GaugeVec,
    tcp: GaugeVec,
    http: GaugeVec,
}

impl PrometheusSink {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let icmp = GaugeVec::new(
            Opts::new(ICMP_LATENCY, "ICMP echo latency to a target"),
            &["target", "host", "status", "error"],
        )?;
        let tcp = GaugeVec::new(
            Opts::new(TCP_LATENCY, "TCP connection establishment time"),
            &["target", "host", "port", "status", "error"],
        )?;
        let http = GaugeVec::new(
            Opts::new(HTTP_LATENCY, "HTTP GET latency"),
            &["target", "url", "status", "error"],
        )?;

        registry.register(Box::new(icmp.clone()))?;
        registry.register(Box::new(tcp.clone()))?;
        registry.register(Box::new(http.clone()))?;

        Ok(Self { registry, icmp, tcp, http })
    }

    /// Render every family in the text exposition format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl MetricsSink for PrometheusSink {
    fn publish(&self, target: &Target, spec: &ProbeSpec, result: &ProbeResult) {
        let labels = result.labels();
        let status = labels.status.as_str();
        let value = result.metric_value();

        match spec {
            ProbeSpec::Icmp => self
                .icmp
                .with_label_values(&[&target.name, &target.host, status, &labels.error])
                .set(value),
            ProbeSpec::Tcp { port } => self
                .tcp
                .with_label_values(&[
                    &target.name,
                    &target.host,
                    &port.to_string(),
                    status,
                    &labels.error,
                ])
                .set(value),
            ProbeSpec::Http { url } => self
                .http
                .with_label_values(&[&target.name, url, status, &labels.error])
                .set(value),
        }
    }
}
