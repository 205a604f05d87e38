//! ICMP echo probes.
//!
//! [`SystemPingChecker`] shells out to the platform `ping` utility, which
//! works unprivileged almost everywhere. [`SocketPingChecker`] sends the echo
//! itself through `surge-ping`; it needs unprivileged ICMP sockets
//! (`net.ipv4.ping_group_range`) or CAP_NET_RAW.

use std::net::IpAddr;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use rand::random;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use super::{Checker, ProbeResult, ProbeSpec, elapsed_ms, truncate_error, unsupported};
use crate::MAX_ERROR_LEN;
use crate::error::SetupError;

const ECHO_PAYLOAD: [u8; 56] = [0; 56];

/// Single echo request through `ping -c 1 -W <secs> <host>`.
pub struct SystemPingChecker {
    program: String,
    timeout: Duration,
}

impl SystemPingChecker {
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("ping", timeout)
    }

    /// Use a different ping binary, e.g. an absolute path.
    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }

    /// `-W` only takes whole seconds; round down but never below one.
    fn wait_seconds(&self) -> u64 {
        self.timeout.as_secs().max(1)
    }

    /// Hard bound on the whole process run, matching the shortest `-W`.
    fn deadline(&self) -> Duration {
        self.timeout.max(Duration::from_secs(1))
    }
}

#[async_trait::async_trait]
impl Checker for SystemPingChecker {
    async fn check(&self, host: &str, spec: &ProbeSpec) -> ProbeResult {
        if *spec != ProbeSpec::Icmp {
            return unsupported(spec);
        }

        let mut command = Command::new(&self.program);
        command
            .args(["-c", "1", "-W", &self.wait_seconds().to_string(), host])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let start = Instant::now();
        let output = match timeout(self.deadline(), command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ProbeResult::failure(
                    None,
                    truncate_error(&format!("failed to run {}: {e}", self.program), MAX_ERROR_LEN),
                );
            }
            Err(_) => return ProbeResult::failure(Some(elapsed_ms(start)), "ping timed out"),
        };
        let latency = elapsed_ms(start);

        if output.status.success() {
            ProbeResult::success(latency)
        } else {
            ProbeResult::failure(Some(latency), truncate_error(&diagnostic(&output), MAX_ERROR_LEN))
        }
    }
}

/// What ping said about the failure: stderr if any, otherwise its last line
/// of stdout (the loss summary), otherwise the exit status.
fn diagnostic(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| format!("ping exited with {}", output.status))
}

/// Single echo request sent from our own ICMP socket.
pub struct SocketPingChecker {
    v4: Client,
    v6: Option<Client>,
    timeout: Duration,
}

impl SocketPingChecker {
    pub fn new(timeout: Duration) -> Result<Self, SetupError> {
        let v4 = Client::new(&Config::default()).map_err(SetupError::IcmpSocket)?;
        let v6 = match Client::new(&Config::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("ICMPv6 socket unavailable, IPv6 targets will fail: {e}");
                None
            }
        };

        Ok(Self { v4, v6, timeout })
    }

    async fn ping(&self, host: &str) -> Result<(), String> {
        let addr = resolve(host).await?;
        let client = match addr {
            IpAddr::V4(_) => &self.v4,
            IpAddr::V6(_) => self.v6.as_ref().ok_or("ICMPv6 socket unavailable")?,
        };

        let mut pinger = client.pinger(addr, PingIdentifier(random())).await;
        pinger.timeout(self.timeout);
        pinger
            .ping(PingSequence(0), &ECHO_PAYLOAD)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[async_trait::async_trait]
impl Checker for SocketPingChecker {
    async fn check(&self, host: &str, spec: &ProbeSpec) -> ProbeResult {
        if *spec != ProbeSpec::Icmp {
            return unsupported(spec);
        }

        let start = Instant::now();
        match timeout(self.timeout, self.ping(host)).await {
            Ok(Ok(())) => ProbeResult::success(elapsed_ms(start)),
            Ok(Err(e)) => ProbeResult::failure(None, truncate_error(&e, MAX_ERROR_LEN)),
            Err(_) => ProbeResult::failure(None, "ping timed out"),
        }
    }
}

async fn resolve(host: &str) -> Result<IpAddr, String> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| format!("failed to resolve {host}: {e}"))?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| format!("no address found for {host}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn script(dir: &std::path::Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ping");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_wait_seconds_never_below_one() {
        assert_eq!(SystemPingChecker::new(Duration::from_millis(300)).wait_seconds(), 1);
        assert_eq!(SystemPingChecker::new(Duration::from_secs(3)).wait_seconds(), 3);
    }

    #[test]
    fn test_deadline_follows_timeout() {
        let short = SystemPingChecker::new(Duration::from_millis(300));
        assert_eq!(short.deadline(), Duration::from_secs(1));

        let long = SystemPingChecker::new(Duration::from_millis(2500));
        assert_eq!(long.deadline(), Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn test_missing_binary_is_untimed_failure() {
        let checker =
            SystemPingChecker::with_program("/nonexistent/netmon-ping", Duration::from_secs(1));

        let result = checker.check("127.0.0.1", &ProbeSpec::Icmp).await;
        assert!(!result.success);
        assert_eq!(result.latency_ms, None);
        assert!(result.error.unwrap().contains("/nonexistent/netmon-ping"));
    }

    #[tokio::test]
    async fn test_rejects_other_specs() {
        let checker = SystemPingChecker::new(Duration::from_secs(1));
        let result = checker.check("127.0.0.1", &ProbeSpec::Tcp { port: 80 }).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_resolve_literal_address() {
        assert_eq!(resolve("::1").await.unwrap(), "::1".parse::<IpAddr>().unwrap());
        assert_eq!(resolve("10.0.0.1").await.unwrap(), "10.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_without_output() {
        // `false` ignores the ping arguments and exits 1 without output.
        let checker = SystemPingChecker::with_program("false", Duration::from_secs(1));
        let result = checker.check("127.0.0.1", &ProbeSpec::Icmp).await;
        assert!(!result.success);
        assert!(result.latency_ms.is_some());
        assert!(result.error.unwrap().starts_with("ping exited with"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_is_preferred_over_stdout() {
        let dir = tempfile::tempdir().unwrap();
        // Arguments are `-c 1 -W <secs> <host>`, so the host is $5.
        let program = script(
            dir.path(),
            "echo '1 packets transmitted, 0 received'\necho \"ping: unknown host $5\" >&2\nexit 2",
        );
        let checker = SystemPingChecker::with_program(program, Duration::from_secs(1));

        let result = checker.check("nowhere.invalid", &ProbeSpec::Icmp).await;
        assert!(!result.success);
        assert!(result.latency_ms.is_some());
        assert_eq!(result.error.as_deref(), Some("ping: unknown host nowhere.invalid"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_summary_without_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(
            dir.path(),
            "echo 'PING h'\necho ''\necho '1 packets transmitted, 0 received, 100% packet loss'\nexit 1",
        );
        let checker = SystemPingChecker::with_program(program, Duration::from_secs(1));

        let result = checker.check("h", &ProbeSpec::Icmp).await;
        assert_eq!(
            result.error.as_deref(),
            Some("1 packets transmitted, 0 received, 100% packet loss")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_process_is_bounded_by_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "sleep 10");
        let checker = SystemPingChecker::with_program(program, Duration::from_millis(300));

        let start = Instant::now();
        let result = checker.check("127.0.0.1", &ProbeSpec::Icmp).await;

        assert!(start.elapsed() < Duration::from_millis(1800));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("ping timed out"));
    }
}
