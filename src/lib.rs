//! score-server - Async scoring service with supervised lifecycle.
//!
//! This crate provides an HTTP scoring API with a bounded process
//! lifetime and always-on observability. Two listeners run concurrently:
//! the scoring API and a Prometheus metrics endpoint, both supervised by
//! a single coordinator that ends the process on the first fatal failure
//! or when the global run deadline elapses.
//!
//! # Features
//!
//! - **Async I/O**: Built on Tokio for high-performance async networking
//! - **Supervised Lifetime**: Deadline-bounded run with coordinated shutdown
//! - **Distributed Tracing**: OTLP span export with W3C context propagation
//! - **Access Logging**: Structured JSON logging with tracing
//! - **Prometheus Metrics**: Dedicated scrape listener, isolated from the API
//!
//! # Example
//!
//! ```rust,ignore
//! use score_server::config::Config;
//! use score_server::supervisor::Supervisor;
//!
//! let config = Config::from_env()?;
//! let mut supervisor = Supervisor::new(config.server.run_deadline, 2);
//! // spawn listeners, then:
//! let cause = supervisor.run().await;
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod logging;
pub mod middleware;
pub mod observability;
pub mod scoring;
pub mod server;
pub mod supervisor;

// Re-exports for convenience
pub use config::Config;
pub use supervisor::{ShutdownCause, Supervisor};
