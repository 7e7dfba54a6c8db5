//! # courier
//!
//! Courier relay server binary. Wires the history store, session registry,
//! and HTTP/WebSocket surface together and runs the server.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use courier_server::{AppState, ServerConfig, app, metrics};
use courier_store::{HistoryStore, SqliteHistory};
use mimalloc::MiMalloc;
use tracing::info;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Courier relay server.
#[derive(Parser, Debug)]
#[command(name = "courier", about = "Real-time WebSocket message relay")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "8420")]
    port: u16,

    /// Path to the `SQLite` history database.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Evict sessions idle longer than this many seconds. Disabled when
    /// omitted.
    #[arg(long)]
    idle_timeout_secs: Option<u64>,
}

impl Cli {
    fn default_db_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".courier").join("history.db")
    }

    fn into_config(self) -> ServerConfig {
        ServerConfig {
            db_path: self.db_path.unwrap_or_else(Self::default_db_path),
            host: self.host,
            port: self.port,
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().into_config();

    courier_core::logging::init("info");

    ensure_parent_dir(&config.db_path)?;
    let history = SqliteHistory::open(&config.db_path)
        .with_context(|| format!("Failed to open database: {}", config.db_path.display()))?;
    info!(path = %config.db_path.display(), "history database ready");

    let metrics_handle = metrics::install_recorder();
    let state = AppState::new(
        Arc::new(history) as Arc<dyn HistoryStore>,
        Some(metrics_handle),
    );

    if let Some(max_idle) = config.idle_timeout {
        let registry = Arc::clone(&state.registry);
        let _ = tokio::spawn(async move {
            // Sweep at a fraction of the timeout so eviction lag stays small.
            let mut interval = tokio::time::interval(max_idle / 4);
            loop {
                let _ = interval.tick().await;
                let evicted = registry.evict_idle(max_idle).await;
                if evicted > 0 {
                    info!(evicted, "evicted idle sessions");
                }
            }
        });
    }

    let addr = config.bind_addr().context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local = listener.local_addr()?;
    info!("courier listening on http://{local}");

    axum::serve(listener, app(state))
        .await
        .context("Server error")?;
    Ok(())
}
