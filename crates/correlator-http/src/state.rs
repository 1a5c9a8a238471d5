// crates/correlator-http/src/state.rs
// ============================================================================
// Module: Shared Application State
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use correlator_auth::RateLimiter;
use correlator_core::alias::AliasConfig;
use sqlx::PgPool;

/// Everything a handler or middleware stage needs, cloned cheaply per
/// request (every field is `Arc`-backed or `Copy`).
#[derive(Clone)]
pub struct AppState {
    /// Relational store connection pool.
    pub pool: PgPool,
    /// Aliasing resolver, loaded once at startup.
    pub alias_config: Arc<AliasConfig>,
    /// Three-tier rate limiter.
    pub rate_limiter: Arc<RateLimiter>,
    /// Whether the authenticate-plugin stage runs.
    pub auth_enabled: bool,
    /// Process start time, for `/health`'s uptime field.
    pub started_at: Instant,
}
