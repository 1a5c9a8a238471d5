// crates/correlator-auth/src/lib.rs
// ============================================================================
// Crate: correlator-auth
// ============================================================================

//! API-key authentication and three-tier rate limiting: the two
//! cross-cutting concerns the request middleware chain applies to every
//! `/api/v1/*` call.

pub mod api_key;
pub mod rate_limit;

pub use api_key::lookup_and_verify;
pub use api_key::mask_key;
pub use api_key::ApiKeyError;
pub use api_key::PluginContext;
pub use rate_limit::PluginTierConfig;
pub use rate_limit::RateLimitTier;
pub use rate_limit::RateLimiter;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Runs the plugin-bucket idle-eviction sweep on an interval until
/// `cancellation` fires.
pub async fn run_eviction_loop(
    limiter: Arc<RateLimiter>,
    cleanup_interval: Duration,
    cancellation: CancellationToken,
) {
    let mut ticker = tokio::time::interval(cleanup_interval);
    loop {
        tokio::select! {
            () = cancellation.cancelled() => return,
            _ = ticker.tick() => limiter.evict_idle(),
        }
    }
}
