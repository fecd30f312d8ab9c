//! Startup helpers for the talk server.
//!
//! Reads `.env` and the process environment once, then serves until Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;

use crate::server::{self, AppState};
use crate::talk::core::config::TalkConfig;
use crate::talk::core::errors::TalkResult;

/// Run the server (used by the `episode-talk-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Episode Talk Maker v{}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let state = match initialize() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create state: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

/// Load configuration and build the application state without starting the server.
///
/// # Errors
/// Returns an error if the configuration is invalid or state creation fails.
pub fn initialize() -> TalkResult<Arc<AppState>> {
    let config = TalkConfig::from_env()?;
    tracing::info!(
        "Completion backend: {} (model {}, timeout {}s, key configured: {})",
        config.base_url,
        config.model,
        config.llm.timeout_secs,
        config.has_api_key()
    );
    tracing::info!(
        "Allowed origins: {}; {} chars/sec",
        config.allowed_origins.join(", "),
        config.prompt.chars_per_sec
    );

    AppState::new(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
