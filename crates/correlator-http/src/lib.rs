// crates/correlator-http/src/lib.rs
// ============================================================================
// Crate: correlator-http
// ============================================================================

//! The request middleware chain, ingestion/query handlers, and RFC 7807
//! error body shared by every non-2xx/207 response.

pub mod middleware;
pub mod problem;
pub mod router;
pub mod routes;
pub mod state;

pub use problem::Problem;
pub use router::build_router;
pub use state::AppState;
