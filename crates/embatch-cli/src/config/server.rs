//! Listener and shutdown settings.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Result as AnyhowResult, bail};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default grace period in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT: u64 = 30;

/// Longest accepted grace period in seconds.
const MAX_SHUTDOWN_TIMEOUT: u64 = 300;

/// Where the HTTP API listens and how long a shutdown may take.
///
/// ```bash
/// embatch --host 0.0.0.0 --port 8080
/// HOST=0.0.0.0 PORT=8080 embatch
/// ```
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[serde(default)]
#[must_use = "config does nothing unless you use it"]
pub struct ServerConfig {
    /// Address to bind; 0.0.0.0 listens on every interface.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to bind, 1024 or above.
    #[arg(short = 'p', long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds granted to in-flight requests and running jobs once a
    /// shutdown signal arrives (1-300).
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = DEFAULT_SHUTDOWN_TIMEOUT)]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> AnyhowResult<()> {
        if self.port < 1024 {
            bail!("port {} requires elevated privileges, use 1024 or above", self.port);
        }
        if !(1..=MAX_SHUTDOWN_TIMEOUT).contains(&self.shutdown_timeout) {
            bail!(
                "shutdown timeout must be between 1 and {MAX_SHUTDOWN_TIMEOUT} seconds, got {}",
                self.shutdown_timeout
            );
        }
        Ok(())
    }

    #[must_use]
    pub const fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Grace period for draining requests and stopping workers.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    #[must_use]
    pub fn binds_to_all_interfaces(&self) -> bool {
        self.host.is_unspecified()
    }

    /// Loopback-only listeners are treated as local development setups.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.host.is_loopback()
    }

    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            addr = %self.server_addr(),
            shutdown_timeout_secs = self.shutdown_timeout,
            development = self.is_development(),
            "Server configuration"
        );
    }
}
