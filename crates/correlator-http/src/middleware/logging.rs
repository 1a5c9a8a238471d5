// crates/correlator-http/src/middleware/logging.rs
// ============================================================================
// Module: Request Logging Middleware
// ============================================================================

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use correlator_auth::PluginContext;

use crate::middleware::correlation::CorrelationId;

/// Logs one structured line per completed request: method, path, status,
/// duration, correlation ID, plugin ID (if authenticated), response size.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let correlation_id = req
        .extensions()
        .get::<CorrelationId>()
        .cloned()
        .unwrap_or_default()
        .0;
    let plugin_id = req.extensions().get::<PluginContext>().map(|ctx| ctx.plugin_id.clone());

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed();

    let response_size = response
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        duration_ms = duration.as_millis(),
        correlation_id = %correlation_id,
        plugin_id = ?plugin_id,
        response_size = ?response_size,
        "request completed"
    );

    response
}
