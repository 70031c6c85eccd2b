//! Command line and config file handling

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Parser};
use shared_protocol::{Role, SessionConfig};

/// RSA-secured character chat over a point-to-point link
#[derive(Debug, Parser)]
#[command(name = "tether-peer", version, about)]
#[command(group(ArgGroup::new("endpoint").required(true).args(["listen", "connect"])))]
pub struct Cli {
    /// Which side of the handshake this peer plays (caller or listener)
    #[arg(short, long)]
    pub role: Role,

    /// Wait for the other peer on this address
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Dial the other peer at this address
    #[arg(long, value_name = "ADDR")]
    pub connect: Option<SocketAddr>,

    /// JSON session config
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Handshake wait in milliseconds, negative waits forever
    #[arg(long, allow_negative_numbers = true)]
    pub timeout_ms: Option<i64>,
}

/// Where the link comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Listen(SocketAddr),
    Connect(SocketAddr),
}

impl Cli {
    pub fn endpoint(&self) -> anyhow::Result<Endpoint> {
        match (self.listen, self.connect) {
            (Some(addr), None) => Ok(Endpoint::Listen(addr)),
            (None, Some(addr)) => Ok(Endpoint::Connect(addr)),
            _ => anyhow::bail!("exactly one of --listen or --connect is required"),
        }
    }

    /// Config file (or defaults) with command line overrides applied
    pub fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SessionConfig::default(),
        };
        if let Some(timeout_ms) = self.timeout_ms {
            config.handshake_timeout_ms = timeout_ms;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<SessionConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_listener() {
        let cli = Cli::try_parse_from([
            "tether-peer",
            "--role",
            "listener",
            "--listen",
            "127.0.0.1:19823",
        ])
        .unwrap();
        assert_eq!(cli.role, Role::Listener);
        assert_eq!(
            cli.endpoint().unwrap(),
            Endpoint::Listen("127.0.0.1:19823".parse().unwrap())
        );
    }

    #[test]
    fn test_endpoint_is_required() {
        assert!(Cli::try_parse_from(["tether-peer", "--role", "caller"]).is_err());
    }

    #[test]
    fn test_listen_and_connect_conflict() {
        let result = Cli::try_parse_from([
            "tether-peer",
            "--role",
            "caller",
            "--listen",
            "127.0.0.1:1",
            "--connect",
            "127.0.0.1:2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = Cli::try_parse_from([
            "tether-peer",
            "--role",
            "bystander",
            "--connect",
            "127.0.0.1:1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_timeout_flag_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"handshake_timeout_ms": 250, "drain_on_start": false}}"#).unwrap();

        let path = file.path().to_str().unwrap();
        let cli = Cli::try_parse_from([
            "tether-peer",
            "--role",
            "caller",
            "--connect",
            "127.0.0.1:19823",
            "--config",
            path,
            "--timeout-ms",
            "-1",
        ])
        .unwrap();

        let config = cli.session_config().unwrap();
        assert_eq!(config.handshake_timeout_ms, -1);
        assert!(config.handshake_timeout().is_none());
        assert!(!config.drain_on_start);
        assert_eq!(config.poll_interval_ms, 1);
    }

    #[test]
    fn test_invalid_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"poll_interval_ms": 0}}"#).unwrap();

        let cli = Cli {
            role: Role::Caller,
            listen: None,
            connect: Some("127.0.0.1:19823".parse().unwrap()),
            config: Some(file.path().to_path_buf()),
            timeout_ms: None,
        };
        assert!(cli.session_config().is_err());
    }
}
