use std::io::Error as IoError;

use netprobe::{ConfigError, MetricsError, SetupError, SnapshotError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("probe setup failed: {0}")]
    Setup(#[from] SetupError),
    #[error("metrics registry error: {0}")]
    Metrics(#[from] MetricsError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("metrics server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
