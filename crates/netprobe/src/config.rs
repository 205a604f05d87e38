//! Monitor configuration: the target list, the cycle cadence and probe settings.
//!
//! A configuration file is either TOML (`.toml` extension) or YAML (anything
//! else), for example:
//!
//! ```yaml
//! interval_seconds: 5
//! targets:
//!   - name: gateway
//!     host: 192.168.0.1
//!     icmp: true
//!     tcp_ports: [22, 80]
//!     http_urls: ["http://192.168.0.1/"]
//! ```

use std::collections::HashSet;
use std::time::Duration;
use std::{fmt, fs, path};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::probe::ProbeSpec;

const DEFAULT_INTERVAL_SECONDS: u64 = 5;

/// A named endpoint and the probes configured against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub host: String,
    #[serde(default = "default_true")]
    pub icmp: bool,
    #[serde(default)]
    pub tcp_ports: Vec<u16>,
    #[serde(default)]
    pub http_urls: Vec<String>,
}

impl Target {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            icmp: true,
            tcp_ports: Vec::new(),
            http_urls: Vec::new(),
        }
    }

    pub fn with_icmp(mut self, enabled: bool) -> Self {
        self.icmp = enabled;
        self
    }

    pub fn with_tcp_port(mut self, port: u16) -> Self {
        self.tcp_ports.push(port);
        self
    }

    pub fn with_http_url(mut self, url: impl Into<String>) -> Self {
        self.http_urls.push(url.into());
        self
    }

    /// Probes for this target in execution order: ICMP, then every TCP port,
    /// then every HTTP URL, each list in configured order.
    pub fn probes(&self) -> Vec<ProbeSpec> {
        let icmp = self.icmp.then_some(ProbeSpec::Icmp);
        let tcp = self.tcp_ports.iter().map(|&port| ProbeSpec::Tcp { port });
        let http = self.http_urls.iter().map(|url| ProbeSpec::Http { url: url.clone() });

        icmp.into_iter().chain(tcp).chain(http).collect()
    }
}

/// Per-kind probe timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub icmp_seconds: f64,
    pub tcp_seconds: f64,
    pub http_seconds: f64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { icmp_seconds: 1.0, tcp_seconds: 1.0, http_seconds: 2.0 }
    }
}

impl Timeouts {
    pub fn icmp(&self) -> Duration {
        Duration::from_secs_f64(self.icmp_seconds)
    }

    pub fn tcp(&self) -> Duration {
        Duration::from_secs_f64(self.tcp_seconds)
    }

    pub fn http(&self) -> Duration {
        Duration::from_secs_f64(self.http_seconds)
    }
}

/// HTTP probe settings. Certificate validation is off unless `verify_tls` is
/// set, so an `up` HTTP probe says nothing about the peer's identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub verify_tls: bool,
}

/// How ICMP echo requests are sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IcmpBackend {
    /// Spawn the system `ping` utility.
    #[default]
    System,
    /// Send the echo request ourselves. Needs a kernel that allows
    /// unprivileged ICMP sockets or CAP_NET_RAW.
    Socket,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcmpSettings {
    pub backend: IcmpBackend,
}

/// Global monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub icmp: IcmpSettings,
    /// Maximum number of probes in flight within one cycle. 1 keeps probes
    /// strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECONDS
}

fn default_concurrency() -> usize {
    1
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            targets: Vec::new(),
            timeouts: Timeouts::default(),
            http: HttpSettings::default(),
            icmp: IcmpSettings::default(),
            concurrency: default_concurrency(),
        }
    }
}

impl fmt::Display for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Monitor configuration:")?;
        writeln!(f, "  interval: {}s", self.interval_seconds)?;
        writeln!(f, "  concurrency: {}", self.concurrency)?;
        writeln!(
            f,
            "  timeouts: icmp {}s, tcp {}s, http {}s",
            self.timeouts.icmp_seconds, self.timeouts.tcp_seconds, self.timeouts.http_seconds
        )?;
        writeln!(f, "  icmp backend: {:?}", self.icmp.backend)?;
        writeln!(f, "  verify tls: {}", self.http.verify_tls)?;
        writeln!(f, "  targets:")?;
        for target in &self.targets {
            writeln!(
                f,
                "    {} ({}): icmp={} tcp={:?} http={}",
                target.name,
                target.host,
                target.icmp,
                target.tcp_ports,
                target.http_urls.len()
            )?;
        }
        Ok(())
    }
}

impl MonitorConfig {
    /// Load and validate a configuration file.
    ///
    /// Files ending in `.toml` are parsed as TOML, everything else as YAML.
    pub fn from_path(path: impl AsRef<path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

        if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        // An empty YAML document is an empty configuration.
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the interval when an explicit override was given.
    pub fn with_interval_override(
        mut self,
        interval_seconds: Option<u64>,
    ) -> Result<Self, ConfigError> {
        if let Some(interval) = interval_seconds {
            validate_interval(interval)?;
            self.interval_seconds = interval;
        }
        Ok(self)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Number of probes one cycle will run.
    pub fn probe_count(&self) -> usize {
        self.targets
            .iter()
            .map(|t| usize::from(t.icmp) + t.tcp_ports.len() + t.http_urls.len())
            .sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval(self.interval_seconds)?;
        validate_timeout("icmp", self.timeouts.icmp_seconds)?;
        validate_timeout("tcp", self.timeouts.tcp_seconds)?;
        validate_timeout("http", self.timeouts.http_seconds)?;

        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }

        let mut names = HashSet::new();
        for target in &self.targets {
            validate_target(target)?;
            if !names.insert(target.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate target name: {}",
                    target.name
                )));
            }
        }

        Ok(())
    }
}

fn validate_interval(interval_seconds: u64) -> Result<(), ConfigError> {
    if interval_seconds == 0 {
        return Err(ConfigError::Invalid("interval_seconds must be positive".into()));
    }
    Ok(())
}

fn validate_timeout(kind: &str, seconds: f64) -> Result<(), ConfigError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "{kind} timeout must be a positive number of seconds, got {seconds}"
        )));
    }
    if Duration::try_from_secs_f64(seconds).is_err() {
        return Err(ConfigError::Invalid(format!("{kind} timeout is out of range: {seconds}")));
    }
    Ok(())
}

fn validate_target(target: &Target) -> Result<(), ConfigError> {
    if target.name.trim().is_empty() {
        return Err(ConfigError::Invalid("target name must not be empty".into()));
    }
    if target.host.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("target {} has an empty host", target.name)));
    }

    if target.tcp_ports.contains(&0) {
        return Err(ConfigError::Invalid(format!(
            "target {}: port 0 is not valid",
            target.name
        )));
    }

    for raw in &target.http_urls {
        let url = Url::parse(raw).map_err(|e| {
            ConfigError::Invalid(format!("target {}: invalid URL {raw}: {e}", target.name))
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "target {}: unsupported scheme {other} in {raw}",
                    target.name
                )));
            }
        }
    }

    Ok(())
}
