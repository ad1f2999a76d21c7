//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use super::parse::{env_duration, env_or, env_parse};
use super::ConfigError;

/// Server configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// API listener port (SERVER_PORT, default 8000).
    pub port: u16,
    /// Metrics listener address (METRICS_ADDR, default 0.0.0.0:9090).
    pub metrics_addr: SocketAddr,
    /// Global process lifetime (RUN_DEADLINE, default 10m).
    pub run_deadline: Duration,
    /// Scoring configuration file consumed by the scoring engine
    /// (SCORE_CONFIG, default score_1.yaml).
    pub score_config: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let metrics_addr = env_or("METRICS_ADDR", "0.0.0.0:9090");
        let metrics_addr: SocketAddr =
            metrics_addr.parse().map_err(|_| ConfigError::Invalid {
                key: "METRICS_ADDR".into(),
                message: format!("not a socket address: {}", metrics_addr),
            })?;

        Ok(Self {
            port: env_parse("SERVER_PORT", 8000)?,
            metrics_addr,
            run_deadline: env_duration("RUN_DEADLINE", "10m")?,
            score_config: env_or("SCORE_CONFIG", "score_1.yaml"),
        })
    }

    /// Bind address for the API listener.
    pub fn api_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            metrics_addr: "0.0.0.0:9090".parse().expect("valid default addr"),
            run_deadline: Duration::from_secs(600),
            score_config: "score_1.yaml".to_string(),
        }
    }
}
