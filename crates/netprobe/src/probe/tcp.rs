use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{Checker, ProbeResult, ProbeSpec, elapsed_ms, truncate_error, unsupported};
use crate::MAX_ERROR_LEN;

/// TCP connect checker. The timeout covers name resolution and the
/// handshake; nothing is sent once connected.
pub struct TcpChecker {
    timeout: Duration,
}

impl TcpChecker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait::async_trait]
impl Checker for TcpChecker {
    async fn check(&self, host: &str, spec: &ProbeSpec) -> ProbeResult {
        let ProbeSpec::Tcp { port } = spec else {
            return unsupported(spec);
        };

        let start = Instant::now();
        match timeout(self.timeout, TcpStream::connect((host, *port))).await {
            Ok(Ok(stream)) => {
                let latency = elapsed_ms(start);
                drop(stream);
                ProbeResult::success(latency)
            }
            Ok(Err(e)) => ProbeResult::failure(None, truncate_error(&e.to_string(), MAX_ERROR_LEN)),
            Err(_) => ProbeResult::failure(None, "connection timed out"),
        }
    }
}
