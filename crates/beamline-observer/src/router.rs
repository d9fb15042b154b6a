//! Axum router construction for the Observer API.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled so the browser client can call the API from another origin.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET|POST /start` -- start the beam
/// - `GET|POST /stop` -- stop the beam
/// - `GET /state` -- state summary
/// - `POST /state` -- status report from the external feed
/// - `GET /api/snapshot` -- full beam snapshot
/// - `GET /metrics` -- Prometheus exposition
/// - `GET /kick_power` -- kick-power draw
/// - `GET /health` -- liveness probe
///
/// CORS allows any origin, method and header.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // Commands
        .route("/start", get(handlers::start).post(handlers::start))
        .route("/stop", get(handlers::stop).post(handlers::stop))
        .route("/state", get(handlers::get_state).post(handlers::post_state))
        // Read API
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/metrics", get(handlers::metrics))
        .route("/kick_power", get(handlers::kick_power))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
