use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use clap::Parser;

/// Network probes (ICMP, TCP, HTTP) with Prometheus export and JSON snapshots.
#[derive(Debug, Parser)]
#[command(name = "netmon", version, about)]
pub struct Cli {
    /// Path to the YAML (or .toml) configuration file.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Seconds between two cycles. Overrides the configuration file.
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Directory receiving the JSON snapshots.
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Port of the Prometheus metrics endpoint.
    #[arg(long, default_value_t = 8000)]
    pub metrics_port: u16,

    /// Address the metrics endpoint binds to.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub metrics_bind: IpAddr,

    /// Run a single cycle, write its snapshot and exit.
    #[arg(long)]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["netmon", "-c", "monitor.yaml"]).unwrap();

        assert_eq!(cli.config, PathBuf::from("monitor.yaml"));
        assert_eq!(cli.interval, None);
        assert_eq!(cli.results_dir, PathBuf::from("results"));
        assert_eq!(cli.metrics_port, 8000);
        assert_eq!(cli.metrics_bind, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert!(!cli.once);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "netmon",
            "--config",
            "m.toml",
            "-i",
            "30",
            "--results-dir",
            "/var/lib/netmon",
            "--metrics-port",
            "9100",
            "--metrics-bind",
            "127.0.0.1",
            "--once",
        ])
        .unwrap();

        assert_eq!(cli.interval, Some(30));
        assert_eq!(cli.results_dir, PathBuf::from("/var/lib/netmon"));
        assert_eq!(cli.metrics_port, 9100);
        assert_eq!(cli.metrics_bind, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(cli.once);
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["netmon"]).is_err());
    }
}
