use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading or validating a [`crate::MonitorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures while persisting a cycle snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to move snapshot into place: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("snapshot task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failures from the Prometheus registry.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics exposition is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Failures while building the probe checkers.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("failed to open ICMP socket: {0}")]
    IcmpSocket(#[source] IoError),
}
