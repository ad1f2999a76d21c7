use std::sync::Arc;

use tracing::{error, info};

use score_server::config::Config;
use score_server::middleware::RequestLogger;
use score_server::observability::{Metrics, Telemetry};
use score_server::scoring::ScoringEngine;
use score_server::server::{ApiServer, MetricsServer};
use score_server::supervisor::{ShutdownCause, Supervisor};
use score_server::{logging, PKG_VERSION};

/// Listener tasks the supervisor watches over. Sizes the failure channel.
const SUPERVISED_TASKS: usize = 2;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    logging::init(&config.logging);

    info!("Starting score-server {}", PKG_VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Tracing is required infrastructure. If the pipeline cannot be
    // built the process does not start.
    let telemetry = Telemetry::init(&config.telemetry, &config.logging.service_name)?;
    let metrics = Arc::new(Metrics::new()?);

    let mut supervisor = Supervisor::new(config.server.run_deadline, SUPERVISED_TASKS);

    // Scoring API listener.
    let api_addr = config.server.api_addr();
    let engine = ScoringEngine::new(config.server.score_config.as_str());
    let logger = RequestLogger::new(telemetry.tracer(), Arc::clone(&metrics));
    let api_metrics = Arc::clone(&metrics);
    let api_reporter = supervisor.failure_reporter("api");
    let api_shutdown = supervisor.shutdown_watch();
    supervisor.spawn(async move {
        match ApiServer::bind(api_addr, engine, api_metrics, logger).await {
            Ok(server) => {
                if let Err(e) = server.serve(api_shutdown).await {
                    api_reporter.report(e);
                }
            }
            Err(e) => api_reporter.report(e),
        }
    });

    // Prometheus scrape listener, isolated from API traffic.
    let metrics_addr = config.server.metrics_addr;
    let scrape_metrics = Arc::clone(&metrics);
    let metrics_reporter = supervisor.failure_reporter("metrics");
    let metrics_shutdown = supervisor.shutdown_watch();
    supervisor.spawn(async move {
        match MetricsServer::bind(metrics_addr, scrape_metrics).await {
            Ok(server) => {
                if let Err(e) = server.serve(metrics_shutdown).await {
                    metrics_reporter.report(e);
                }
            }
            Err(e) => metrics_reporter.report(e),
        }
    });

    let cause = supervisor.run().await;

    // Buffered spans are flushed on every exit path; the Drop impl
    // backstops panics between here and process exit.
    telemetry.shutdown();

    match cause {
        ShutdownCause::DeadlineElapsed => {
            info!("Shutting down server");
            Ok(())
        }
        ShutdownCause::TaskFailed(failure) => {
            error!("Server exited with error: {}", failure);
            Err(failure.error)
        }
    }
}
