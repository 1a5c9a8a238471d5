// crates/correlator-auth/src/rate_limit.rs
// ============================================================================
// Module: Rate Limiter
// ============================================================================

//! ## Overview
//! Three token-bucket tiers — global, per-plugin, unauthenticated — composed
//! per request per §4.9. Bucket refill math is hand-rolled rather than
//! pulled from a crate: the spec pins exact eviction and growth-warning
//! semantics a generic limiter crate does not expose, and the arithmetic
//! itself is simple. The plugin map is guarded by a read/write lock; no
//! bucket's own refill ever runs while that lock is held for writing.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// One token bucket: a sustained refill rate and a burst capacity.
pub struct TokenBucket {
    rps: f64,
    burst: f64,
    state: Mutex<BucketState>,
    last_used_unix_secs: AtomicU64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a bucket starting full.
    #[must_use]
    pub fn new(rps: f64, burst: u32) -> Self {
        Self {
            rps,
            burst: f64::from(burst),
            state: Mutex::new(BucketState { tokens: f64::from(burst), last_refill: Instant::now() }),
            last_used_unix_secs: AtomicU64::new(unix_now_secs()),
        }
    }

    /// Refills for elapsed time, then attempts to consume one token.
    /// Returns `true` when a token was available.
    pub fn try_acquire(&self) -> bool {
        self.last_used_unix_secs.store(unix_now_secs(), Ordering::Relaxed);

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rps).min(self.burst);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time since this bucket was last consulted, for idle eviction.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        let last = self.last_used_unix_secs.load(Ordering::Relaxed);
        Duration::from_secs(unix_now_secs().saturating_sub(last))
    }
}

fn unix_now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_secs()
}

/// Tuning for the per-plugin tier's lazily-created buckets.
#[derive(Debug, Clone, Copy)]
pub struct PluginTierConfig {
    /// Sustained rate for a freshly created plugin bucket.
    pub rps: f64,
    /// Burst capacity for a freshly created plugin bucket.
    pub burst: u32,
    /// A bucket idle at least this long is evicted.
    pub idle_timeout: Duration,
    /// Bucket-count threshold; crossing 80% of it emits a growth warning.
    pub max_plugins: u32,
}

/// Composes the three tiers and owns the plugin bucket map.
pub struct RateLimiter {
    global: TokenBucket,
    unauth: TokenBucket,
    plugin_tier: PluginTierConfig,
    plugins: RwLock<HashMap<String, Arc<TokenBucket>>>,
}

/// Which tier rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitTier {
    /// The global bucket was empty.
    Global,
    /// The requesting plugin's bucket was empty.
    Plugin,
    /// The unauthenticated bucket was empty.
    Unauthenticated,
}

impl RateLimiter {
    /// Builds a limiter from the global/unauth tuning plus plugin-tier
    /// defaults.
    #[must_use]
    pub fn new(
        global_rps: f64,
        global_burst: u32,
        unauth_rps: f64,
        unauth_burst: u32,
        plugin_tier: PluginTierConfig,
    ) -> Self {
        Self {
            global: TokenBucket::new(global_rps, global_burst),
            unauth: TokenBucket::new(unauth_rps, unauth_burst),
            plugin_tier,
            plugins: RwLock::new(HashMap::new()),
        }
    }

    /// Runs the per-request algorithm of §4.9: global bucket, then the
    /// plugin bucket (if authenticated) or the unauth bucket.
    ///
    /// # Errors
    /// Returns the [`RateLimitTier`] that rejected the request.
    pub fn check(&self, plugin_id: Option<&str>) -> Result<(), RateLimitTier> {
        if !self.global.try_acquire() {
            return Err(RateLimitTier::Global);
        }

        match plugin_id {
            Some(id) => {
                if !self.plugin_bucket(id).try_acquire() {
                    return Err(RateLimitTier::Plugin);
                }
            }
            None => {
                if !self.unauth.try_acquire() {
                    return Err(RateLimitTier::Unauthenticated);
                }
            }
        }
        Ok(())
    }

    fn plugin_bucket(&self, plugin_id: &str) -> Arc<TokenBucket> {
        if let Some(bucket) = self.plugins.read().unwrap_or_else(PoisonError::into_inner).get(plugin_id) {
            return Arc::clone(bucket);
        }

        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(plugins.entry(plugin_id.to_owned()).or_insert_with(|| {
            Arc::new(TokenBucket::new(self.plugin_tier.rps, self.plugin_tier.burst))
        }))
    }

    /// Evicts plugin buckets idle at least `idle_timeout`, and logs a
    /// warning once the remaining count exceeds 80% of `max_plugins`.
    pub fn evict_idle(&self) {
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        let before = plugins.len();
        plugins.retain(|_, bucket| bucket.idle_for() < self.plugin_tier.idle_timeout);
        let evicted = before - plugins.len();
        let remaining = plugins.len();
        drop(plugins);

        if evicted > 0 {
            tracing::info!(evicted, remaining, "rate limiter evicted idle plugin buckets");
        }

        let warn_threshold = f64::from(self.plugin_tier.max_plugins) * 0.8;
        if (remaining as f64) > warn_threshold {
            tracing::warn!(
                remaining,
                max_plugins = self.plugin_tier.max_plugins,
                "rate limiter plugin bucket map approaching max_plugins"
            );
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

    fn tier() -> PluginTierConfig {
        PluginTierConfig { rps: 50.0, burst: 2, idle_timeout: Duration::from_secs(3600), max_plugins: 1000 }
    }

    #[test]
    fn bucket_allows_up_to_burst_then_rejects() {
        let bucket = TokenBucket::new(1.0, 2);
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn global_tier_rejects_before_plugin_tier_is_consulted() {
        let limiter = RateLimiter::new(1.0, 1, 100.0, 100, tier());
        assert!(limiter.check(Some("p1")).is_ok());
        assert_eq!(limiter.check(Some("p1")), Err(RateLimitTier::Global));
    }

    #[test]
    fn unauthenticated_requests_use_unauth_tier() {
        let limiter = RateLimiter::new(100.0, 100, 1.0, 1, tier());
        assert!(limiter.check(None).is_ok());
        assert_eq!(limiter.check(None), Err(RateLimitTier::Unauthenticated));
    }

    #[test]
    fn distinct_plugins_get_independent_buckets() {
        let limiter = RateLimiter::new(100.0, 100, 100.0, 100, tier());
        assert!(limiter.check(Some("p1")).is_ok());
        assert!(limiter.check(Some("p1")).is_ok());
        assert_eq!(limiter.check(Some("p1")), Err(RateLimitTier::Plugin));
        assert!(limiter.check(Some("p2")).is_ok());
    }

    #[test]
    fn evict_idle_removes_only_stale_buckets() {
        let limiter = RateLimiter::new(100.0, 100, 100.0, 100, tier());
        let _ = limiter.check(Some("p1"));
        limiter.evict_idle();
        assert_eq!(limiter.plugins.read().unwrap_or_else(PoisonError::into_inner).len(), 1);
    }
}
