// crates/correlator-http/src/routes/health.rs
// ============================================================================
// Module: Health Probes
// ============================================================================

//! ## Overview
//! `/ping`, `/ready`, `/health` — all unauthenticated and unrated, per
//! §4.10. `/ready` is the only one that touches the database.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Liveness probe: plain 200, no dependency checks.
pub async fn ping() -> &'static str {
    "pong"
}

/// Readiness probe: pings the database, 200 if reachable, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> Response {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (StatusCode::OK, "ready").into_response(),
        Err(error) => {
            tracing::warn!(%error, "readiness probe: database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    uptime_seconds: u64,
}

/// Service uptime JSON.
pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody { status: "ok", uptime_seconds: state.started_at.elapsed().as_secs() })
}
