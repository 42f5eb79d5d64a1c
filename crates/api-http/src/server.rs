//! HTTP Server
//!
//! Router construction for both surfaces and a server wrapper that binds a
//! TCP listener and supports graceful stop.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use taskq_core::application::{ProducerService, QueueMonitor};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Span};

use crate::handler;

pub const DEFAULT_PRODUCER_ADDR: &str = "0.0.0.0:8085";
pub const DEFAULT_MONITOR_ADDR: &str = "0.0.0.0:8081";

/// Producer surface: `POST /task`. Other methods get a 405 from axum.
pub fn producer_router(producer: Arc<ProducerService>) -> Router {
    Router::new()
        .route("/task", post(handler::submit_task))
        .with_state(producer)
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
}

/// Monitor surface: `GET /` and `GET /stats`
pub fn monitor_router(monitor: Arc<QueueMonitor>) -> Router {
    Router::new()
        .route("/", get(handler::dashboard))
        .route("/stats", get(handler::stats))
        .with_state(monitor)
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
}

fn make_span(request: &Request<Body>) -> Span {
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str);

    info_span!(
        "http_request",
        method = ?request.method(),
        matched_path,
    )
}

/// HTTP Server Configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub addr: SocketAddr,
}

/// HTTP Server
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, router: Router) -> Self {
        Self { config, router }
    }

    /// Bind the listener and start serving in the background
    pub async fn start(self) -> Result<HttpServerHandle, String> {
        let listener = TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| format!("Failed to bind {}: {}", self.config.addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| format!("Failed to read local address: {}", e))?;

        info!(addr = %local_addr, "HTTP server listening");

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, self.router)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        Ok(HttpServerHandle {
            local_addr,
            stop_tx: Some(stop_tx),
            task,
        })
    }
}

/// Handle to a running server
pub struct HttpServerHandle {
    local_addr: SocketAddr,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl HttpServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn stop(mut self) -> Result<(), String> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result.map_err(|e| format!("Server error: {}", e)),
            Err(e) => Err(format!("Server task failed: {}", e)),
        }
    }
}
