//! # taskpulse
//!
//! Server binary: loads settings, starts logging and the Prometheus recorder,
//! then serves the task routes until Ctrl-C or SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use taskpulse_server::{AppState, ServerConfig, ShutdownCoordinator};
use taskpulse_settings::Settings;
use taskpulse_telemetry::{LoggingConfig, MetricsSink, SinkConfig};
use tracing::Level;

/// Multi-participant task list with per-request metrics logging.
#[derive(Parser, Debug)]
#[command(name = "taskpulse", about = "Task list server with CSV metrics logging")]
struct Cli {
    /// Settings file (default `./taskpulse.json`, optional).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings, 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Metrics CSV path (overrides settings).
    #[arg(long)]
    metrics_path: Option<PathBuf>,
}

impl Cli {
    /// Load layered settings, then apply command-line overrides on top.
    fn resolve_settings(&self) -> Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => {
                if !path.exists() {
                    bail!("settings file not found: {}", path.display());
                }
                taskpulse_settings::load_settings_from_path(path)
                    .with_context(|| format!("Failed to load settings from {}", path.display()))?
            }
            None => taskpulse_settings::load_settings().context("Failed to load settings")?,
        };

        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(path) = &self.metrics_path {
            settings.metrics.path.clone_from(path);
        }
        Ok(settings)
    }
}

fn logging_config(settings: &Settings) -> LoggingConfig {
    LoggingConfig {
        level: settings.logging.level.parse().unwrap_or(Level::INFO),
        module_levels: Vec::new(),
        json: settings.logging.json,
    }
}

fn sink_config(settings: &Settings) -> SinkConfig {
    SinkConfig {
        sync_writes: settings.metrics.sync_writes,
        max_retries: settings.metrics.max_retries,
        ..SinkConfig::new(&settings.metrics.path)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.resolve_settings()?;

    let _ = taskpulse_telemetry::init_logging(&logging_config(&settings));

    let prometheus = taskpulse_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let sink = MetricsSink::new(sink_config(&settings));
    sink.init().with_context(|| {
        format!(
            "Failed to initialise metrics file {}",
            settings.metrics.path.display()
        )
    })?;

    let config = ServerConfig::from(&settings.server);
    let shutdown_timeout = config.shutdown_timeout;
    let state = AppState::new(config, sink).with_prometheus(prometheus);

    let coordinator = ShutdownCoordinator::new();
    let handle = taskpulse_server::start(state, &coordinator)
        .await
        .context("Failed to start server")?;

    tracing::info!(
        addr = %handle.local_addr(),
        metrics_path = %settings.metrics.path.display(),
        "taskpulse listening on http://{}",
        handle.local_addr()
    );

    shutdown_signal().await;

    tracing::info!("Shutting down...");
    coordinator
        .graceful_shutdown(handle.into_tasks(), shutdown_timeout)
        .await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                let _ = signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl-C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
