//! API HTTP listener.
//!
//! Binds the API port and serves the two routes, every request wrapped by
//! the logging middleware. Bind and serve are split so a bind failure is
//! reported to the supervisor's failure channel before the accept loop
//! starts; the accept loop itself stops as soon as the shutdown watch
//! flips. Open keep-alive connections stop accepting new requests at
//! that point; an in-flight request is allowed to finish.

pub mod metrics;

pub use metrics::MetricsServer;

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::middleware::RequestLogger;
use crate::observability::Metrics;
use crate::scoring::{self, ScoringEngine};

/// Shared per-request state.
struct AppState {
    engine: ScoringEngine,
    metrics: Arc<Metrics>,
    logger: RequestLogger,
}

/// The API listener.
pub struct ApiServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Bind the API listener.
    pub async fn bind(
        addr: SocketAddr,
        engine: ScoringEngine,
        metrics: Arc<Metrics>,
        logger: RequestLogger,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("API server listening on http://{}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            state: Arc::new(AppState {
                engine,
                metrics,
                logger,
            }),
        })
    }

    /// Address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until the shutdown watch flips.
    pub async fn serve(
        self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("API accept error: {}", e);
                            continue;
                        }
                    };

                    let _ = stream.set_nodelay(true);
                    let state = Arc::clone(&self.state);
                    state.metrics.inc_connections();
                    let mut conn_shutdown = shutdown.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc_state = Arc::clone(&state);
                        let service = service_fn(move |req| {
                            let state = Arc::clone(&svc_state);
                            async move {
                                Ok::<_, Infallible>(
                                    handle_request(state, req, remote_addr.ip()).await,
                                )
                            }
                        });

                        let conn = http1::Builder::new().serve_connection(io, service);
                        tokio::pin!(conn);
                        // Keep-alive connections stop taking new requests
                        // once shutdown is signalled; the in-flight request
                        // still completes.
                        let result = tokio::select! {
                            result = conn.as_mut() => result,
                            _ = conn_shutdown.changed() => {
                                conn.as_mut().graceful_shutdown();
                                conn.as_mut().await
                            }
                        };
                        if let Err(e) = result {
                            debug!("API connection error: {}", e);
                        }
                        state.metrics.dec_connections();
                    });
                }
                _ = shutdown.changed() => {
                    debug!("API listener received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
    remote_ip: IpAddr,
) -> Response<Full<Bytes>> {
    let route_state = Arc::clone(&state);
    state
        .logger
        .wrap(req, remote_ip, move |req| route(route_state, req))
        .await
}

/// Route table: two routes, everything else 404.
async fn route(state: Arc<AppState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/run-scores") | (&Method::POST, "/run-scores") => {
            scoring::run_scores(&state.engine, &state.metrics, req).await
        }
        (_, "/run-scores") => text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
        (&Method::GET, "/health") => scoring::health(),
        _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
