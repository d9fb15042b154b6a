//! REST endpoint handlers for the Observer server.
//!
//! Every handler goes through the shared [`SimulationCore`] in
//! [`AppState`]; none of them holds the core's lock across an await point
//! of its own.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET`/`POST` | `/start` | Start the beam |
//! | `GET`/`POST` | `/stop` | Stop the beam |
//! | `GET` | `/state` | Running / failed / speed summary |
//! | `POST` | `/state` | Status report from the external feed |
//! | `GET` | `/api/snapshot` | Full beam snapshot |
//! | `GET` | `/metrics` | Prometheus text exposition |
//! | `GET` | `/kick_power` | One kick-power draw |
//! | `GET` | `/health` | Liveness probe |
//!
//! [`SimulationCore`]: beamline_core::simulation::SimulationCore

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use beamline_types::{KickPower, StatusObservation};

use crate::error::ObserverError;
use crate::metrics::CONTENT_TYPE;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the beam and links to the API.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.core.snapshot().await;
    let mode = snapshot.mode.as_str();
    let control = format!("{:?}", snapshot.control_state);
    let status = snapshot.status;
    let energy = format!("{:.3}", snapshot.beam.energy_tev);
    let speed = format!("{:.3}", snapshot.beam.speed_percent_c);
    let phase = format!("{:.1}", snapshot.rf_phase_degrees);
    let drift = format!("{:.4}", snapshot.beam.phase_drift_radians);
    let ticks = snapshot.ticks;
    let run = snapshot
        .run_id
        .map_or_else(|| String::from("none"), |id| id.to_string());

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Beamline Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Beamline Observer</h1>
    <p class="subtitle">RF cavity beam simulation ({mode} mode)</p>

    <p>Beam: <span class="status">{control}</span> (status {status}) -- run {run}</p>

    <div>
        <div class="metric">
            <div class="label">Energy (TeV)</div>
            <div class="value">{energy}</div>
        </div>
        <div class="metric">
            <div class="label">Speed (% c)</div>
            <div class="value">{speed}</div>
        </div>
        <div class="metric">
            <div class="label">RF phase (deg)</div>
            <div class="value">{phase}</div>
        </div>
        <div class="metric">
            <div class="label">Drift (rad)</div>
            <div class="value">{drift}</div>
        </div>
        <div class="metric">
            <div class="label">Ticks</div>
            <div class="value">{ticks}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET/POST <a href="/start">/start</a> -- Start the beam</li>
        <li>GET/POST <a href="/stop">/stop</a> -- Stop the beam</li>
        <li>GET <a href="/state">/state</a> -- State summary (POST: status report)</li>
        <li>GET <a href="/api/snapshot">/api/snapshot</a> -- Full snapshot</li>
        <li>GET <a href="/metrics">/metrics</a> -- Prometheus gauges</li>
        <li>GET <a href="/kick_power">/kick_power</a> -- Kick-power draw</li>
        <li>GET <a href="/health">/health</a> -- Liveness</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// /start and /stop -- beam commands
// ---------------------------------------------------------------------------

/// Start the beam. Reports `started`, `running` or `failed`.
pub async fn start(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let outcome = state.core.request_start().await?;
    Ok(Json(serde_json::json!({ "status": outcome.as_str() })))
}

/// Stop the beam. Reports `stopped` or `failed`.
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    let outcome = state.core.request_stop().await?;
    Ok(Json(serde_json::json!({ "status": outcome.as_str() })))
}

// ---------------------------------------------------------------------------
// /state -- summary and status reports
// ---------------------------------------------------------------------------

/// Return `{running, failed, speed_percent_c}`.
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.core.snapshot().await.summary())
}

/// Apply a `{status, speed}` report from the external feed.
///
/// A body that is not a JSON object with an integer `status` and a numeric
/// `speed` is rejected with 400 before the core is touched.
pub async fn post_state(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StatusObservation>, JsonRejection>,
) -> Result<impl IntoResponse, ObserverError> {
    let Json(observation) =
        payload.map_err(|rejection| ObserverError::MalformedObservation(rejection.body_text()))?;
    let accepted = state.core.observe(observation).await?;
    Ok(Json(serde_json::json!({
        "status": accepted.status,
        "speed": accepted.speed,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/snapshot -- full snapshot
// ---------------------------------------------------------------------------

/// Return the complete [`BeamSnapshot`](beamline_types::BeamSnapshot).
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.core.snapshot().await)
}

// ---------------------------------------------------------------------------
// GET /metrics -- Prometheus exposition
// ---------------------------------------------------------------------------

/// Export every gauge in the Prometheus text format.
pub async fn metrics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let body = state.metrics.export_text()?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body))
}

// ---------------------------------------------------------------------------
// GET /kick_power -- kick draw
// ---------------------------------------------------------------------------

/// Draw one kick power from the seeded generator.
pub async fn kick_power(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(KickPower {
        kick_power: state.kick.draw(),
    })
}

// ---------------------------------------------------------------------------
// GET /health -- liveness
// ---------------------------------------------------------------------------

/// Always `OK` while the server is up.
pub async fn health() -> &'static str {
    "OK"
}
