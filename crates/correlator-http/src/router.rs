// crates/correlator-http/src/router.rs
// ============================================================================
// Module: Router Composition
// ============================================================================

//! ## Overview
//! Wires the fixed middleware chain of §4.10 around two route groups: a
//! protected `/api/v1/*` group (authenticate, then rate limit, then
//! request logging, then CORS) and an unprotected health group (request
//! logging, then CORS). Correlation-ID and panic recovery wrap the whole
//! router, so every request — health probes included — gets a
//! correlation ID and a guaranteed non-panicking response.
//!
//! Layers are added innermost-first: the last `.layer()` call on a given
//! router is the outermost middleware, the first to see the request.

use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::middleware::authenticate;
use crate::middleware::correlation_id;
use crate::middleware::panic_recovery;
use crate::middleware::rate_limit;
use crate::middleware::request_logging;
use crate::routes::health::health;
use crate::routes::health::ping;
use crate::routes::health::ready;
use crate::routes::ingest::ingest_events;
use crate::routes::query::lineage_impact;
use crate::routes::query::list_incidents;
use crate::state::AppState;

fn api_v1_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/lineage/events", post(ingest_events))
        .route("/incidents", get(list_incidents))
        .route("/impact/{run_id}", get(lineage_impact))
        .layer(cors)
        .route_layer(middleware::from_fn(request_logging))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}

fn health_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/ready", get(ready))
        .route("/health", get(health))
        .layer(cors)
        .route_layer(middleware::from_fn(request_logging))
        .with_state(state)
}

/// Builds the full router: the two route groups, wrapped in the
/// correlation-ID and panic-recovery stages.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_router(state.clone(), cors.clone()))
        .merge(health_router(state, cors))
        .layer(middleware::from_fn(panic_recovery))
        .layer(middleware::from_fn(correlation_id))
}
