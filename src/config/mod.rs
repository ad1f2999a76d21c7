//! Configuration module for score-server.
//!
//! This module provides centralized configuration loading from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use score_server::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("API port: {}", config.server.port);
//! println!("Traces endpoint: {}", config.telemetry.traces_endpoint);
//! ```

mod error;
mod logging;
mod parse;
mod server;
mod telemetry;

pub use error::ConfigError;
pub use logging::LoggingConfig;
pub use server::ServerConfig;
pub use telemetry::TelemetryConfig;

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Server configuration (listeners, deadline, scoring config file).
    pub server: ServerConfig,
    /// Trace export configuration.
    pub telemetry: TelemetryConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }
}
