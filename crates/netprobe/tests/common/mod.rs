//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use netprobe::{Checker, MetricsSink, ProbeExecutor, ProbeResult, ProbeSpec, Target};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve every connection with an empty response carrying `status`.
/// Returns the base URL.
pub async fn serve_status(status: u16) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {status} Test\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}/")
}

/// Answer every connection with a plaintext HTTP response straight away,
/// without reading. A TLS client gets garbage instead of a ServerHello.
/// Returns the `https://` URL of the listener.
pub async fn serve_plaintext_to_tls() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("https://{addr}/")
}

/// A port on localhost with nothing listening.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Sink that remembers every publish, in order.
#[derive(Default)]
pub struct RecordingSink {
    pub samples: Mutex<Vec<(String, ProbeSpec, ProbeResult)>>,
}

impl MetricsSink for RecordingSink {
    fn publish(&self, target: &Target, spec: &ProbeSpec, result: &ProbeResult) {
        self.samples
            .lock()
            .unwrap()
            .push((target.name.clone(), spec.clone(), result.clone()));
    }
}

/// Checker that answers after a delay chosen per spec, so completion order
/// differs from configured order when probes overlap.
pub struct DelayedChecker;

impl DelayedChecker {
    fn delay(spec: &ProbeSpec) -> Duration {
        match spec {
            ProbeSpec::Icmp => Duration::from_millis(60),
            ProbeSpec::Tcp { port } => Duration::from_millis(u64::from(*port % 50)),
            ProbeSpec::Http { .. } => Duration::from_millis(5),
        }
    }
}

#[async_trait::async_trait]
impl Checker for DelayedChecker {
    async fn check(&self, host: &str, spec: &ProbeSpec) -> ProbeResult {
        tokio::time::sleep(Self::delay(spec)).await;
        if host.starts_with("down") {
            ProbeResult::failure(None, format!("{host} unreachable"))
        } else {
            ProbeResult::success(Self::delay(spec).as_secs_f64() * 1000.0)
        }
    }
}

pub fn delayed_executor() -> ProbeExecutor {
    let checker: Arc<dyn Checker> = Arc::new(DelayedChecker);
    ProbeExecutor::new(checker.clone(), checker.clone(), checker)
}
