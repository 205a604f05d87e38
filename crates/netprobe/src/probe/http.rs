use std::error::Error as StdError;
use std::time::{Duration, Instant};

use super::{Checker, ProbeResult, ProbeSpec, elapsed_ms, truncate_error, unsupported};
use crate::MAX_ERROR_LEN;

/// HTTP GET checker. 2xx and 3xx count as up; redirects are followed.
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    /// `verify_tls = false` accepts any certificate. Only use that for
    /// measuring reachability, never to trust a response.
    pub fn new(timeout: Duration, verify_tls: bool) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .user_agent(concat!("netmon/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, _host: &str, spec: &ProbeSpec) -> ProbeResult {
        let ProbeSpec::Http { url } = spec else {
            return unsupported(spec);
        };

        let start = Instant::now();
        let outcome = self.client.get(url).send().await;
        let latency = elapsed_ms(start);

        match outcome {
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    ProbeResult::success(latency)
                } else {
                    ProbeResult::failure(Some(latency), format!("HTTP {}", status.as_u16()))
                }
            }
            Err(e) if is_tls_error(&e) => ProbeResult::failure(Some(latency), "SSL error"),
            Err(e) if e.is_timeout() => ProbeResult::failure(Some(latency), "request timed out"),
            Err(e) => ProbeResult::failure(Some(latency), transport_error(&e)),
        }
    }
}

/// Error label for a request that failed below HTTP.
fn transport_error(error: &(dyn StdError + 'static)) -> String {
    truncate_error(&describe(error), MAX_ERROR_LEN)
}

/// Error text with its causes, innermost last. reqwest's own message only
/// names the URL.
fn describe(error: &(dyn StdError + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// TLS failures surface as opaque connect errors; look through the causes.
/// The top-level message is skipped because it contains the URL.
fn is_tls_error(error: &(dyn StdError + 'static)) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string().to_ascii_lowercase();
        if ["certificate", "tls", "ssl", "handshake"].iter().any(|needle| text.contains(needle)) {
            return true;
        }
        source = cause.source();
    }
    false
}
