//! Metrics HTTP listener.
//!
//! A second listener on its own port so metrics scraping stays available
//! independently of API traffic. Serves `GET /metrics` in Prometheus text
//! format and nothing else.

use std::convert::Infallible;
use std::net::SocketAddr;
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

use crate::observability::Metrics;

/// The metrics scrape listener.
pub struct MetricsServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    metrics: Arc<Metrics>,
}

impl MetricsServer {
    /// Bind the metrics listener. A bind failure is returned to the caller
    /// so the supervisor decides shutdown sequencing.
    pub async fn bind(
        addr: SocketAddr,
        metrics: Arc<Metrics>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Metrics server listening on http://{}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            metrics,
        })
    }

    /// Address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept scrapes until the shutdown watch flips.
    pub async fn serve(
        self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, _) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Metrics accept error: {}", e);
                            continue;
                        }
                    };

                    let _ = stream.set_nodelay(true);
                    let metrics = Arc::clone(&self.metrics);
                    let mut conn_shutdown = shutdown.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            let metrics = Arc::clone(&metrics);
                            async move { handle_scrape(req, metrics).await }
                        });

                        let conn = http1::Builder::new().serve_connection(io, service);
                        tokio::pin!(conn);
                        // Keep-alive scrape connections close out once
                        // shutdown is signalled.
                        let result = tokio::select! {
                            result = conn.as_mut() => result,
                            _ = conn_shutdown.changed() => {
                                conn.as_mut().graceful_shutdown();
                                conn.as_mut().await
                            }
                        };
                        if let Err(e) = result {
                            debug!("Metrics connection error: {}", e);
                        }
                    });
                }
                _ = shutdown.changed() => {
                    debug!("Metrics listener received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn handle_scrape(
    req: Request<Incoming>,
    metrics: Arc<Metrics>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/plain; version=0.0.4")
            .body(Full::new(Bytes::from(metrics.export())))
            .unwrap(),
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("Content-Type", "text/plain")
            .body(Full::new(Bytes::from("Not Found")))
            .unwrap(),
    };

    Ok(response)
}
