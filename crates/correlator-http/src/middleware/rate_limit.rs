// crates/correlator-http/src/middleware/rate_limit.rs
// ============================================================================
// Module: Rate Limit Middleware
// ============================================================================

use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use correlator_auth::PluginContext;

use crate::middleware::correlation::CorrelationId;
use crate::problem::Problem;
use crate::state::AppState;

/// Runs the three-tier token-bucket check, rejecting with 429 when the
/// applicable bucket is empty.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let correlation_id = req
        .extensions()
        .get::<CorrelationId>()
        .cloned()
        .unwrap_or_default()
        .0;
    let plugin_id = req.extensions().get::<PluginContext>().map(|ctx| ctx.plugin_id.clone());

    match state.rate_limiter.check(plugin_id.as_deref()) {
        Ok(()) => next.run(req).await,
        Err(tier) => {
            tracing::warn!(correlation_id = %correlation_id, ?tier, "rate limit exceeded");
            Problem::too_many_requests("rate limit exceeded", correlation_id).into_response()
        }
    }
}
