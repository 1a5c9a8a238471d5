// crates/correlator-http/src/problem.rs
// ============================================================================
// Module: RFC 7807 Problem Details
// ============================================================================

//! ## Overview
//! Every non-2xx/207 response shares this body shape. No internal error
//! type is serialized onto the wire directly — handlers and middleware
//! translate into a [`Problem`] at the boundary, matching the teacher's
//! pattern of never leaking domain errors past the edge.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

/// An `application/problem+json` error body.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    /// A URI identifying the problem category. `"about:blank"` when there
    /// is no more specific identifier.
    #[serde(rename = "type")]
    pub problem_type: String,
    /// Short, human-readable summary of the problem category.
    pub title: String,
    /// The HTTP status code.
    pub status: u16,
    /// Human-readable explanation specific to this occurrence.
    pub detail: String,
    /// A URI identifying this specific occurrence, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// The correlation ID of the request that produced this problem.
    pub correlation_id: String,
}

impl Problem {
    /// Builds a `Problem` for `status` with `title`/`detail`, tagged with
    /// the request's correlation ID.
    #[must_use]
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            problem_type: "about:blank".to_owned(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: None,
            correlation_id: correlation_id.into(),
        }
    }

    /// 400 Bad Request: malformed envelope.
    #[must_use]
    pub fn bad_request(detail: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request", detail, correlation_id)
    }

    /// 401 Unauthorized, using one of the two generic details the spec
    /// requires ("missing credentials" / "invalid credentials").
    #[must_use]
    pub fn unauthorized(detail: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", detail, correlation_id)
    }

    /// 422 Unprocessable Entity: all events in a batch failed validation.
    #[must_use]
    pub fn unprocessable(detail: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "Unprocessable Entity", detail, correlation_id)
    }

    /// 429 Too Many Requests.
    #[must_use]
    pub fn too_many_requests(detail: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests", detail, correlation_id)
    }

    /// 500 Internal Server Error. Never includes panic or error detail in
    /// the body beyond this fixed phrase.
    #[must_use]
    pub fn internal_error(correlation_id: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "an unexpected error occurred",
            correlation_id,
        )
    }

    /// 503 Service Unavailable: readiness probe failed.
    #[must_use]
    pub fn service_unavailable(detail: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable", detail, correlation_id)
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self)).into_response();
        response
            .headers_mut()
            .insert("content-type", "application/problem+json".parse().unwrap_or_else(|_| {
                axum::http::HeaderValue::from_static("application/json")
            }));
        response
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

    #[test]
    fn bad_request_carries_400() {
        let problem = Problem::bad_request("malformed envelope", "corr-1");
        assert_eq!(problem.status, 400);
        assert_eq!(problem.correlation_id, "corr-1");
    }

    #[test]
    fn internal_error_never_includes_caller_detail() {
        let problem = Problem::internal_error("corr-2");
        assert_eq!(problem.detail, "an unexpected error occurred");
    }
}
