//! Probe executors.
//!
//! Every [`Checker`] performs exactly one bounded attempt and always answers
//! with a [`ProbeResult`]; failures are values, never errors. The
//! [`ProbeExecutor`] routes a [`ProbeSpec`] to the checker for its kind and
//! turns a panicking checker into a failed result as well.

pub mod http;
pub mod icmp;
pub mod tcp;
mod types;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

pub use http::HttpChecker;
pub use icmp::{SocketPingChecker, SystemPingChecker};
pub use tcp::TcpChecker;
pub use types::{ProbeLabels, ProbeResult, ProbeStatus, truncate_error};
pub(crate) use types::elapsed_ms;

use crate::MAX_ERROR_LEN;
use crate::config::{IcmpBackend, MonitorConfig};
use crate::error::SetupError;

/// Protocol used by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Icmp,
    Tcp,
    Http,
}

/// One configured probe against a target: the kind plus its port or URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProbeSpec {
    Icmp,
    Tcp { port: u16 },
    Http { url: String },
}

impl ProbeSpec {
    pub fn kind(&self) -> ProbeKind {
        match self {
            ProbeSpec::Icmp => ProbeKind::Icmp,
            ProbeSpec::Tcp { .. } => ProbeKind::Tcp,
            ProbeSpec::Http { .. } => ProbeKind::Http,
        }
    }
}

impl std::fmt::Display for ProbeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeSpec::Icmp => write!(f, "icmp"),
            ProbeSpec::Tcp { port } => write!(f, "tcp/{port}"),
            ProbeSpec::Http { url } => write!(f, "http {url}"),
        }
    }
}

/// A single-attempt probe implementation.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Probe `host` as described by `spec`. Must not outlive the checker's
    /// own timeout by more than process overhead.
    async fn check(&self, host: &str, spec: &ProbeSpec) -> ProbeResult;
}

/// Result for a spec handed to the wrong checker.
pub(crate) fn unsupported(spec: &ProbeSpec) -> ProbeResult {
    ProbeResult::failure(None, format!("unsupported probe for this checker: {spec}"))
}

/// Dispatches probes to the checker of their kind.
#[derive(Clone)]
pub struct ProbeExecutor {
    icmp: Arc<dyn Checker>,
    tcp: Arc<dyn Checker>,
    http: Arc<dyn Checker>,
}

impl ProbeExecutor {
    pub fn new(icmp: Arc<dyn Checker>, tcp: Arc<dyn Checker>, http: Arc<dyn Checker>) -> Self {
        Self { icmp, tcp, http }
    }

    /// Build the stock checkers from the timeouts and settings in `config`.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, SetupError> {
        let icmp: Arc<dyn Checker> = match config.icmp.backend {
            IcmpBackend::System => Arc::new(SystemPingChecker::new(config.timeouts.icmp())),
            IcmpBackend::Socket => Arc::new(SocketPingChecker::new(config.timeouts.icmp())?),
        };

        if !config.http.verify_tls {
            warn!(
                "TLS certificate validation is DISABLED for HTTP probes; set http.verify_tls \
                 to enable it"
            );
        }
        let http = HttpChecker::new(config.timeouts.http(), config.http.verify_tls)?;

        Ok(Self::new(icmp, Arc::new(TcpChecker::new(config.timeouts.tcp())), Arc::new(http)))
    }

    /// Run one probe. Never panics and never fails: a checker that panics
    /// yields a failed result carrying the panic message.
    pub async fn execute(&self, host: &str, spec: &ProbeSpec) -> ProbeResult {
        let checker = match spec.kind() {
            ProbeKind::Icmp => &self.icmp,
            ProbeKind::Tcp => &self.tcp,
            ProbeKind::Http => &self.http,
        };

        match AssertUnwindSafe(checker.check(host, spec)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(host, probe = %spec, "checker panicked: {message}");
                ProbeResult::failure(None, truncate_error(&message, MAX_ERROR_LEN))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "probe panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(ProbeResult);

    #[async_trait::async_trait]
    impl Checker for Fixed {
        async fn check(&self, _host: &str, _spec: &ProbeSpec) -> ProbeResult {
            self.0.clone()
        }
    }

    struct Panicking;

    #[async_trait::async_trait]
    impl Checker for Panicking {
        async fn check(&self, host: &str, _spec: &ProbeSpec) -> ProbeResult {
            panic!("resolver exploded for {host}");
        }
    }

    fn executor_with(icmp: Arc<dyn Checker>) -> ProbeExecutor {
        ProbeExecutor::new(
            icmp,
            Arc::new(Fixed(ProbeResult::success(2.0))),
            Arc::new(Fixed(ProbeResult::failure(Some(3.0), "HTTP 500"))),
        )
    }

    #[tokio::test]
    async fn test_execute_routes_by_kind() {
        let executor = executor_with(Arc::new(Fixed(ProbeResult::success(1.0))));

        assert_eq!(executor.execute("h", &ProbeSpec::Icmp).await.latency_ms, Some(1.0));
        assert_eq!(executor.execute("h", &ProbeSpec::Tcp { port: 1 }).await.latency_ms, Some(2.0));

        let http = executor.execute("h", &ProbeSpec::Http { url: "http://h/".into() }).await;
        assert_eq!(http.error.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn test_execute_catches_panics() {
        let executor = executor_with(Arc::new(Panicking));

        let result = executor.execute("db01", &ProbeSpec::Icmp).await;
        assert!(!result.success);
        assert_eq!(result.latency_ms, None);
        assert_eq!(result.error.as_deref(), Some("resolver exploded for db01"));
    }

    #[test]
    fn test_spec_json_shape() {
        let tcp = serde_json::to_value(ProbeSpec::Tcp { port: 22 }).unwrap();
        assert_eq!(tcp, serde_json::json!({"type": "tcp", "port": 22}));

        let icmp = serde_json::to_value(ProbeSpec::Icmp).unwrap();
        assert_eq!(icmp, serde_json::json!({"type": "icmp"}));
    }
}
