//! Integration tests for score-server
//!
//! Every test spins the listeners up in-process on ephemeral ports, so
//! no external services are required.
//! Run with: cargo test --test integration

mod helpers;

mod lifecycle;
mod metrics_endpoint;
