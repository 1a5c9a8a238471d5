// crates/correlator-config/src/lib.rs
// ============================================================================
// Crate: correlator-config
// ============================================================================

//! Environment-derived application configuration and aliasing-YAML loading.
//! Both are ambient concerns: parsed once at startup into immutable
//! structures, never hot-reloaded.

use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use correlator_core::alias::AliasConfig;

mod env_var {
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const AUTH_ENABLED: &str = "CORRELATOR_AUTH_ENABLED";
    pub const GLOBAL_RPS: &str = "CORRELATOR_GLOBAL_RPS";
    pub const GLOBAL_BURST: &str = "CORRELATOR_GLOBAL_BURST";
    pub const PLUGIN_RPS: &str = "CORRELATOR_PLUGIN_RPS";
    pub const PLUGIN_BURST: &str = "CORRELATOR_PLUGIN_BURST";
    pub const UNAUTH_RPS: &str = "CORRELATOR_UNAUTH_RPS";
    pub const UNAUTH_BURST: &str = "CORRELATOR_UNAUTH_BURST";
    pub const RATE_LIMIT_CLEANUP_INTERVAL: &str = "CORRELATOR_RATE_LIMIT_CLEANUP_INTERVAL";
    pub const RATE_LIMIT_IDLE_TIMEOUT: &str = "CORRELATOR_RATE_LIMIT_IDLE_TIMEOUT";
    pub const RATE_LIMIT_MAX_PLUGINS: &str = "CORRELATOR_RATE_LIMIT_MAX_PLUGINS";
    pub const IDEMPOTENCY_CLEANUP_INTERVAL: &str = "IDEMPOTENCY_CLEANUP_INTERVAL";
    pub const CONFIG_PATH: &str = "CORRELATOR_CONFIG_PATH";
}

/// Default path to the aliasing YAML when `CORRELATOR_CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_PATH: &str = ".correlator.yaml";

/// Tuning for one token-bucket tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketConfig {
    /// Sustained refill rate, in tokens per second.
    pub rps: f64,
    /// Maximum bucket capacity.
    pub burst: u32,
}

/// Tuning for the rate-limiter plugin-bucket map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterConfig {
    /// Global tier, keyed by a singleton bucket.
    pub global: BucketConfig,
    /// Per-plugin tier, keyed by `plugin_id`.
    pub plugin: BucketConfig,
    /// Unauthenticated tier, keyed by a singleton bucket.
    pub unauth: BucketConfig,
    /// Interval between idle-bucket eviction sweeps.
    pub cleanup_interval: Duration,
    /// A bucket idle at least this long is evicted on the next sweep.
    pub idle_timeout: Duration,
    /// Bucket-count threshold (as a fraction of this) that triggers a
    /// growth warning; the warning fires at 80% of this value.
    pub max_plugins: u32,
}

/// Environment-derived application configuration.
///
/// # Invariants
/// - Every field has a documented default; construction never fails outright
///   on a missing key, only on a key present with an unparseable value.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Relational store DSN.
    pub database_url: String,
    /// Whether the authenticate-plugin middleware stage runs.
    pub auth_enabled: bool,
    /// Rate-limiter tuning.
    pub rate_limiter: RateLimiterConfig,
    /// Idempotency reaper sweep interval.
    pub idempotency_cleanup_interval: Duration,
    /// Path to the aliasing YAML.
    pub config_path: PathBuf,
}

/// Failures while parsing configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required key was absent.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    /// A key was present but its value could not be parsed.
    #[error("invalid value for environment variable {key}: {value}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// The unparseable value.
        value: String,
    },
}

impl AppConfig {
    /// Loads configuration from process environment variables, applying
    /// documented defaults for every key except `DATABASE_URL`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Missing`] when `DATABASE_URL` is absent, or
    /// [`ConfigError::Invalid`] when a present key fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var(env_var::DATABASE_URL).map_err(|_| ConfigError::Missing(env_var::DATABASE_URL))?;

        Ok(Self {
            database_url,
            auth_enabled: parse_bool_env(env_var::AUTH_ENABLED, true)?,
            rate_limiter: RateLimiterConfig {
                global: BucketConfig {
                    rps: parse_env(env_var::GLOBAL_RPS, 100.0)?,
                    burst: parse_env(env_var::GLOBAL_BURST, 200)?,
                },
                plugin: BucketConfig {
                    rps: parse_env(env_var::PLUGIN_RPS, 50.0)?,
                    burst: parse_env(env_var::PLUGIN_BURST, 100)?,
                },
                unauth: BucketConfig {
                    rps: parse_env(env_var::UNAUTH_RPS, 10.0)?,
                    burst: parse_env(env_var::UNAUTH_BURST, 20)?,
                },
                cleanup_interval: parse_seconds_env(env_var::RATE_LIMIT_CLEANUP_INTERVAL, 5 * 60)?,
                idle_timeout: parse_seconds_env(env_var::RATE_LIMIT_IDLE_TIMEOUT, 60 * 60)?,
                max_plugins: parse_env(env_var::RATE_LIMIT_MAX_PLUGINS, 1000)?,
            },
            idempotency_cleanup_interval: parse_seconds_env(
                env_var::IDEMPOTENCY_CLEANUP_INTERVAL,
                60 * 60,
            )?,
            config_path: env::var(env_var::CONFIG_PATH)
                .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from),
        })
    }

    /// Bootstraps `.env` (best-effort, missing file is not an error) and
    /// delegates to [`Self::from_env`].
    ///
    /// # Errors
    /// See [`Self::from_env`].
    pub fn bootstrap() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!(error = %err, "no .env file loaded");
        }
        Self::from_env()
    }
}

fn parse_bool_env(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn parse_seconds_env(key: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    parse_env(key, default_secs).map(Duration::from_secs)
}

/// Loads the aliasing YAML at `path`. A missing file degrades to
/// [`AliasConfig::identity`] (logged at `warn`); a present-but-malformed
/// file degrades the same way, also logged at `warn`. This function never
/// fails: aliasing is a convenience layer, not a startup dependency.
#[must_use]
pub fn load_alias_config(path: &Path) -> AliasConfig {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "aliasing config not found, using identity");
            return AliasConfig::identity();
        }
    };
    match serde_yaml::from_str(&raw) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "aliasing config malformed, using identity");
            AliasConfig::identity()
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

    #[test]
    fn load_alias_config_missing_file_is_identity() {
        let config = load_alias_config(Path::new("/nonexistent/path/.correlator.yaml"));
        assert_eq!(config.resolve("ns", "name"), "ns/name");
    }

    #[test]
    fn load_alias_config_malformed_file_is_identity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".correlator.yaml");
        std::fs::write(&path, "not: [valid yaml for this schema").expect("write");
        let config = load_alias_config(&path);
        assert_eq!(config.resolve("ns", "name"), "ns/name");
    }

    #[test]
    fn load_alias_config_parses_documented_shape() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".correlator.yaml");
        std::fs::write(
            &path,
            r#"
namespace_aliases:
  "dbt://demo": "postgresql://demo"
dataset_patterns:
  - pattern: "demo_postgres/{name}"
    canonical: "postgresql://demo/marts.{name}"
"#,
        )
        .expect("write");
        let config = load_alias_config(&path);
        assert_eq!(config.resolve_namespace("dbt://demo"), "postgresql://demo");
        assert_eq!(
            config.resolve_urn("demo_postgres/orders"),
            "postgresql://demo/marts.orders"
        );
    }

    #[test]
    fn parse_bool_env_accepts_common_spellings() {
        assert!(parse_bool_env("UNSET_KEY_FOR_TEST", true).unwrap());
    }
}
