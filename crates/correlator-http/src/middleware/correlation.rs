// crates/correlator-http/src/middleware/correlation.rs
// ============================================================================
// Module: Correlation-ID Middleware
// ============================================================================

//! ## Overview
//! Outermost stage of the chain. Reads `X-Correlation-ID` from the
//! request; generates a UUID when absent. Attaches the ID to the request
//! extensions for downstream stages/handlers and echoes it on the response.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

/// The request-scoped correlation ID, attached to request extensions by
/// [`correlation_id`] and read back out by every later stage.
#[derive(Debug, Clone, Default)]
pub struct CorrelationId(pub String);

/// Header name recognized on input and always set on output.
pub const HEADER_NAME: &str = "x-correlation-id";

/// Ensures every request carries a correlation ID, generating one when the
/// caller did not supply it.
pub async fn correlation_id(mut req: Request, next: Next) -> Response {
    let incoming = req
        .headers()
        .get(HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(str::to_owned);

    let id = incoming.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    req.extensions_mut().insert(CorrelationId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(HEADER_NAME, value);
    }
    response
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
    fn correlation_id_default_is_empty() {
        assert_eq!(CorrelationId::default().0, "");
    }
}
