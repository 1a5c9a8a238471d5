// crates/correlator-http/src/middleware/auth.rs
// ============================================================================
// Module: Authenticate-Plugin Middleware
// ============================================================================

//! ## Overview
//! Applied only to the `/api/v1/*` route group. Accepts `X-Api-Key` or
//! `Authorization: Bearer <key>`, in that order. Missing and invalid
//! credentials return the same generic detail text for the wrong case
//! (unknown key vs. wrong key) but a distinct one for entirely absent
//! credentials, per the two generic messages the wire contract allows.

use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use correlator_auth::lookup_and_verify;
use correlator_auth::PluginContext;

use crate::middleware::correlation::CorrelationId;
use crate::problem::Problem;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";
const BEARER_PREFIX: &str = "Bearer ";

/// Authenticates the request against `api_keys`, attaching a
/// [`PluginContext`] to the request extensions on success.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let correlation_id = req
        .extensions()
        .get::<CorrelationId>()
        .cloned()
        .unwrap_or_default()
        .0;

    if !state.auth_enabled {
        return next.run(req).await;
    }

    let Some(presented) = extract_key(req.headers()) else {
        return Problem::unauthorized("missing credentials", correlation_id).into_response();
    };

    match lookup_and_verify(&state.pool, &presented).await {
        Ok(Some(context)) => {
            req.extensions_mut().insert(context);
            next.run(req).await
        }
        Ok(None) => Problem::unauthorized("invalid credentials", correlation_id).into_response(),
        Err(error) => {
            tracing::error!(correlation_id = %correlation_id, error = %error, "api key lookup failed");
            Problem::internal_error(correlation_id).into_response()
        }
    }
}

fn extract_key(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        if !value.trim().is_empty() {
            return Some(value.to_owned());
        }
    }

    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted to unwrap."
    )]
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extract_key_prefers_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("k1"));
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer k2"),
        );
        assert_eq!(extract_key(&headers), Some("k1".to_owned()));
    }

    #[test]
    fn extract_key_falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer k2"),
        );
        assert_eq!(extract_key(&headers), Some("k2".to_owned()));
    }

    #[test]
    fn extract_key_missing_is_none() {
        assert_eq!(extract_key(&HeaderMap::new()), None);
    }

    #[test]
    fn plugin_context_not_constructed_on_missing_credentials() {
        // PluginContext is only ever inserted on the success path; there is
        // nothing to assert at the unit level beyond the type being in scope.
        let _ = std::marker::PhantomData::<PluginContext>;
    }
}
