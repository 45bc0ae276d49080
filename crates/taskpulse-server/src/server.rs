//! Router construction, listener startup and background tasks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use taskpulse_store::{SessionRegistry, TaskStore};
use taskpulse_telemetry::MetricsSink;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handlers;
use crate::metrics::observe_sessions_active;
use crate::session::resolve_session;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Task list shared by all participants.
    pub tasks: TaskStore,
    /// Session token to participant mapping.
    pub sessions: Arc<SessionRegistry>,
    /// Metrics file writer.
    pub sink: Arc<MetricsSink>,
    /// Prometheus handle for `GET /metrics`, when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
}

impl AppState {
    /// Fresh state: empty store, no sessions, no Prometheus handle.
    pub fn new(config: ServerConfig, sink: MetricsSink) -> Self {
        Self {
            tasks: TaskStore::new(),
            sessions: Arc::new(SessionRegistry::new()),
            sink: Arc::new(sink),
            prometheus: None,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Attach the handle rendered by `GET /metrics`.
    #[must_use]
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/tasks", get(handlers::list_tasks).post(handlers::add_task))
        .route("/tasks/search", get(handlers::search_tasks))
        .route("/tasks/{id}/delete", post(handlers::delete_task))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle returned by [`start`]. Owns the listener and sweeper tasks.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the listener actually bound (useful with port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Hand the background tasks to [`ShutdownCoordinator::graceful_shutdown`].
    pub fn into_tasks(self) -> Vec<JoinHandle<()>> {
        self.tasks
    }
}

/// Bind the listener and start serving until `shutdown` is triggered.
pub async fn start(
    state: AppState,
    shutdown: &ShutdownCoordinator,
) -> Result<ServerHandle, ServerError> {
    let addr = state.config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    let local_addr = listener.local_addr()?;

    let sweeper = start_session_sweeper(
        Arc::clone(&state.sessions),
        state.config.session_idle,
        state.config.session_sweep,
        shutdown.token(),
    );

    let router = build_router(state);
    let token = shutdown.token();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await;
        if let Err(e) = result {
            error!(error = %e, "server stopped with error");
        }
        info!("server shutdown complete");
    });

    info!(%local_addr, "taskpulse server listening");
    Ok(ServerHandle {
        local_addr,
        tasks: vec![server, sweeper],
    })
}

/// Periodically forget sessions idle for longer than `max_idle`.
pub fn start_session_sweeper(
    sessions: Arc<SessionRegistry>,
    max_idle: Duration,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let _removed = sessions.prune_idle(max_idle);
                    observe_sessions_active(sessions.len());
                }
            }
        }
    })
}
