use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Whether a probe reached its destination, as exposed in metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Up => "up",
            ProbeStatus::Down => "down",
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one probe attempt.
///
/// `latency_ms` is `None` when the attempt could not be timed (spawn failure,
/// TCP connect error). It can be present on a failed attempt, e.g. an HTTP
/// request that completed with a 404.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub success: bool,
    pub latency_ms: Option<f64>,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn success(latency_ms: f64) -> Self {
        Self { success: true, latency_ms: Some(latency_ms), error: None }
    }

    pub fn failure(latency_ms: Option<f64>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            latency_ms,
            error: (!error.is_empty()).then_some(error),
        }
    }

    pub fn status(&self) -> ProbeStatus {
        if self.success { ProbeStatus::Up } else { ProbeStatus::Down }
    }

    /// Label projection used to tag the latency series.
    pub fn labels(&self) -> ProbeLabels {
        ProbeLabels {
            status: self.status(),
            error: self.error.clone().unwrap_or_default(),
        }
    }

    /// Gauge value for this result. An unmeasured attempt reads as 0.0, which
    /// only makes sense together with `status="down"`.
    pub fn metric_value(&self) -> f64 {
        self.latency_ms.unwrap_or(0.0)
    }
}

/// String labels derived from a [`ProbeResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeLabels {
    pub status: ProbeStatus,
    pub error: String,
}

/// Cut `text` down to at most `max` characters.
pub fn truncate_error(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
