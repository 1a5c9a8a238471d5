// crates/correlator-store/src/reaper.rs
// ============================================================================
// Module: Idempotency Reaper
// ============================================================================

//! ## Overview
//! A long-lived background task that keeps `idempotency_records` bounded.
//! On each tick it deletes expired rows in bounded batches until a batch
//! affects zero rows or cancellation fires, sleeping between batches so the
//! sweep never starves foreground traffic.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Tunables for one reaper instance, mirroring the §4.6 defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaperConfig {
    /// Interval between sweeps.
    pub tick: Duration,
    /// Rows deleted per batch.
    pub batch_size: i64,
    /// Sleep between batches within one sweep.
    pub inter_batch_sleep: Duration,
    /// Per-batch query timeout.
    pub query_timeout: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(60 * 60),
            batch_size: 10_000,
            inter_batch_sleep: Duration::from_millis(100),
            query_timeout: Duration::from_secs(30),
        }
    }
}

/// Runs the reaper loop until `cancellation` fires.
///
/// Each tick repeatedly deletes the oldest `batch_size` expired rows until a
/// delete affects zero rows or cancellation fires; cancellation is checked
/// before every batch and during the inter-batch sleep. Database errors are
/// logged and do not abort the loop — the next tick tries again.
pub async fn run(pool: &PgPool, config: ReaperConfig, cancellation: CancellationToken) {
    let mut ticker = tokio::time::interval(config.tick);
    loop {
        tokio::select! {
            () = cancellation.cancelled() => {
                tracing::info!("idempotency reaper shutting down");
                return;
            }
            _ = ticker.tick() => {
                sweep(pool, config, &cancellation).await;
            }
        }
    }
}

async fn sweep(pool: &PgPool, config: ReaperConfig, cancellation: &CancellationToken) {
    loop {
        if cancellation.is_cancelled() {
            return;
        }

        let deleted = tokio::time::timeout(config.query_timeout, delete_batch(pool, config.batch_size))
            .await;

        let rows = match deleted {
            Ok(Ok(rows)) => rows,
            Ok(Err(error)) => {
                tracing::warn!(%error, "idempotency reaper batch failed, will retry next tick");
                return;
            }
            Err(_timeout) => {
                tracing::warn!("idempotency reaper batch timed out, will retry next tick");
                return;
            }
        };

        tracing::info!(rows, "idempotency reaper deleted expired records");
        if rows == 0 {
            return;
        }

        tokio::select! {
            () = cancellation.cancelled() => return,
            () = tokio::time::sleep(config.inter_batch_sleep) => {}
        }
    }
}

async fn delete_batch(pool: &PgPool, batch_size: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM idempotency_records \
         WHERE key IN ( \
             SELECT key FROM idempotency_records \
             WHERE expires_at < now() \
             ORDER BY expires_at \
             LIMIT $1 \
         )",
    )
    .bind(batch_size)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
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
    fn default_config_matches_documented_defaults() {
        let config = ReaperConfig::default();
        assert_eq!(config.tick, Duration::from_secs(3600));
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.inter_batch_sleep, Duration::from_millis(100));
        assert_eq!(config.query_timeout, Duration::from_secs(30));
    }
}
