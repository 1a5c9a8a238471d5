// crates/correlator-auth/src/api_key.rs
// ============================================================================
// Module: API-Key Store
// ============================================================================

//! ## Overview
//! `lookup_and_verify` is the single entry point for turning a presented
//! API key into a [`PluginContext`]. A lookup miss and a verify mismatch
//! must cost the same: both fall through to a bcrypt round against a fixed
//! dummy hash so a timing oracle cannot distinguish "no such key" from
//! "wrong key".

use chrono::DateTime;
use chrono::Utc;
use sha2::Digest;
use sha2::Sha256;
use sqlx::PgPool;
use sqlx::Row;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// A fixed, valid bcrypt hash (cost 10) of a constant never used as a real
/// key. Verifying against it on the lookup-miss path keeps that path's
/// latency indistinguishable from a real verify-mismatch.
const DUMMY_HASH: &str = "$2b$10$CwTycUXWue0Thq9StjUM0uJ8iRC1daSiwU7PmSCtUf7mcM2DkKuVK";
const DUMMY_PASSWORD: &str = "correlator-dummy-bcrypt-compare";

/// Authenticated plugin identity attached to a request on success.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginContext {
    /// Owning plugin identifier.
    pub plugin_id: String,
    /// Human-readable key name.
    pub name: String,
    /// Permission strings granted to this key.
    pub permissions: Vec<String>,
    /// Primary key of the `api_keys` row.
    pub key_id: Uuid,
    /// When authentication succeeded.
    pub auth_time: DateTime<Utc>,
}

/// Errors from the lookup path itself (not auth failure, which is
/// represented by `Ok(None)`).
#[derive(Debug, thiserror::Error)]
pub enum ApiKeyError {
    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Looks up and verifies `presented_key`, returning `Ok(None)` on any
/// authentication failure (unknown key or bad hash) rather than
/// distinguishing the two — callers must not leak which case occurred.
///
/// # Errors
/// Returns [`ApiKeyError`] only for an underlying database failure, not for
/// authentication failure.
pub async fn lookup_and_verify(
    pool: &PgPool,
    presented_key: &str,
) -> Result<Option<PluginContext>, ApiKeyError> {
    let lookup_hash = sha256_hex(presented_key);

    let row = sqlx::query(
        "SELECT id, key_hash, key_lookup_hash, plugin_id, name, permissions \
         FROM api_keys \
         WHERE key_lookup_hash = $1 AND active = true \
         AND (expires_at IS NULL OR expires_at > now())",
    )
    .bind(&lookup_hash)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        dummy_compare();
        return Ok(None);
    };

    let stored_lookup_hash: String = row.get("key_lookup_hash");
    if stored_lookup_hash.as_bytes().ct_eq(lookup_hash.as_bytes()).unwrap_u8() != 1 {
        dummy_compare();
        return Ok(None);
    }

    let key_hash: String = row.get("key_hash");
    let verified = bcrypt::verify(presented_key, &key_hash).unwrap_or(false);
    if !verified {
        return Ok(None);
    }

    let permissions: serde_json::Value = row.get("permissions");
    let permissions = permissions
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
        .unwrap_or_default();

    Ok(Some(PluginContext {
        plugin_id: row.get("plugin_id"),
        name: row.get("name"),
        permissions,
        key_id: row.get("id"),
        auth_time: Utc::now(),
    }))
}

fn dummy_compare() {
    let _ = bcrypt::verify(DUMMY_PASSWORD, DUMMY_HASH);
}

fn sha256_hex(value: &str) -> String {
    use std::fmt::Write;

    let digest = Sha256::digest(value.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Masks `key` for logging: first 8 and last 4 characters, with the middle
/// elided. Never log a presented key unmasked.
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
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
    fn sha256_hex_is_64_chars() {
        assert_eq!(sha256_hex("anything").len(), 64);
    }

    #[test]
    fn sha256_hex_is_deterministic() {
        assert_eq!(sha256_hex("same-key"), sha256_hex("same-key"));
    }

    #[test]
    fn mask_key_elides_middle() {
        let masked = mask_key("ck_live_abcdefghijklmnopqrstuvwxyz");
        assert!(masked.starts_with("ck_live_"));
        assert!(masked.ends_with("wxyz"));
        assert!(masked.contains("..."));
    }

    #[test]
    fn mask_key_short_key_is_fully_redacted() {
        assert_eq!(mask_key("short"), "*****");
    }

    #[test]
    fn dummy_compare_does_not_panic() {
        dummy_compare();
    }
}
