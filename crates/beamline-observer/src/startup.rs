//! Observer server startup helper for embedding in the engine binary.
//!
//! Provides [`spawn_observer`] which binds the listener eagerly, so a
//! taken port fails startup, and then serves on a background Tokio task
//! alongside the scheduler.
//!
//! # Usage
//!
//! ```rust,ignore
//! use beamline_observer::startup::spawn_observer;
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let handle = spawn_observer(&config, state, shutdown_rx).await?;
//! // ...
//! shutdown_tx.send(true)?;
//! handle.await?;
//! ```

use std::sync::Arc;

use beamline_core::config::ServerConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::server::{self, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind the Observer HTTP server and serve it on a background task.
///
/// The task runs until `shutdown` reads `true`. Serve errors after a
/// successful bind are logged, not returned.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is invalid or the port
/// cannot be bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<()>, StartupError> {
    let listener = server::bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state, shutdown).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(
        host = %config.host,
        port = config.port,
        "Observer server spawned on background task"
    );

    Ok(handle)
}
