// crates/correlator-http/src/middleware/panic_recovery.rs
// ============================================================================
// Module: Panic Recovery Middleware
// ============================================================================

//! ## Overview
//! Runs the rest of the chain on a spawned task so a handler panic surfaces
//! as a `JoinError` instead of taking the whole connection (and, absent
//! `catch_unwind` at the runtime boundary, the process) down with it.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use crate::middleware::correlation::CorrelationId;
use crate::problem::Problem;

/// Wraps `next` in a spawned task and converts a panic into a 500.
pub async fn panic_recovery(req: Request, next: Next) -> Response {
    let correlation_id = req
        .extensions()
        .get::<CorrelationId>()
        .cloned()
        .unwrap_or_default()
        .0;

    match tokio::spawn(async move { next.run(req).await }).await {
        Ok(response) => response,
        Err(join_error) => {
            tracing::error!(
                correlation_id = %correlation_id,
                error = %join_error,
                "request handler panicked"
            );
            Problem::internal_error(correlation_id).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted to unwrap."
    )]
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn panicking_handler_yields_500() {
        let app = Router::new()
            .route("/boom", get(|| async { panic!("kaboom") }))
            .layer(axum::middleware::from_fn(panic_recovery));

        let request = axum::http::Request::builder()
            .uri("/boom")
            .body(Body::empty())
            .expect("valid request");
        let response = app.oneshot(request).await.expect("infallible service");
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
