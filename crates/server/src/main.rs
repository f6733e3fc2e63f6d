// crates/server/src/main.rs
//! Pokestrator monitor binary.
//!
//! Resolves configuration from the environment, then serves the snapshot API
//! (and the dashboard when `STATIC_DIR` is set) until killed.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use pokestrator_monitor_server::config::READ_WINDOW_LINES;
use pokestrator_monitor_server::{create_app, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,pokestrator_monitor_server=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    if !config.log_path.exists() {
        tracing::warn!(
            path = %config.log_path.display(),
            "Log file does not exist yet; serving empty snapshots until it appears"
        );
    }

    let state = AppState::new(config.log_path.clone(), READ_WINDOW_LINES);
    let app = create_app(state, config.static_dir.clone());

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;

    tracing::info!(
        addr = %config.addr,
        log_path = %config.log_path.display(),
        static_dir = ?config.static_dir,
        "Pokestrator monitor listening"
    );
    eprintln!("\n  \u{2192} http://{}/api/state\n", config.addr);

    axum::serve(listener, app).await?;

    Ok(())
}
