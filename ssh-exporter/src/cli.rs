use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use ssh_exporter_core::{DispatchOptions, SshOptions};

/// Runs configured scripts on remote hosts over SSH and serves the results to Prometheus.
#[derive(Debug, Parser)]
#[command(name = "ssh_exporter", version, about)]
pub struct Cli {
    /// Path to your ssh_exporter config file.
    #[arg(long, env = "SSH_EXPORTER_CONFIG", default_value = "config.yml")]
    pub config: PathBuf,

    /// Port probed metrics are served on.
    #[arg(long, env = "SSH_EXPORTER_PORT", default_value_t = 9428)]
    pub port: u16,

    /// Address the HTTP server binds to.
    #[arg(long, env = "SSH_EXPORTER_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Maximum number of SSH executions in flight, across all probe requests.
    #[arg(
        long,
        env = "SSH_EXPORTER_MAX_CONCURRENCY",
        default_value_t = 32,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_concurrency: u32,

    /// OpenSSH client used to reach the hosts.
    #[arg(long, env = "SSH_EXPORTER_SSH_BINARY", default_value = "ssh")]
    pub ssh_binary: PathBuf,

    /// TCP connect timeout handed to the SSH client (e.g. "10s").
    #[arg(
        long,
        env = "SSH_EXPORTER_CONNECT_TIMEOUT",
        default_value = "10s",
        value_parser = humantime::parse_duration
    )]
    pub connect_timeout: Duration,
}

impl Cli {
    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            binary: self.ssh_binary.clone(),
            connect_timeout: self.connect_timeout,
        }
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions { max_concurrency: self.max_concurrency as usize }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ssh_exporter"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.yml"));
        assert_eq!(cli.port, 9428);
        assert_eq!(cli.max_concurrency, 32);
        assert_eq!(cli.ssh_options().connect_timeout, Duration::from_secs(10));
        assert_eq!(cli.ssh_options().binary, PathBuf::from("ssh"));
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "ssh_exporter",
            "--config",
            "/etc/ssh_exporter/config.yml",
            "--port",
            "9500",
            "--max-concurrency",
            "4",
            "--connect-timeout",
            "3s",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/ssh_exporter/config.yml"));
        assert_eq!(cli.port, 9500);
        assert_eq!(cli.dispatch_options().max_concurrency, 4);
        assert_eq!(cli.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Cli::try_parse_from(["ssh_exporter", "--max-concurrency", "0"]).is_err());
    }
}
