// crates/correlator-core/src/urn.rs
// ============================================================================
// Module: Dataset URN Canonicalization
// ============================================================================

//! ## Overview
//! Canonicalizes a `(namespace, name)` pair into the single string used as
//! the dataset identity everywhere downstream: `"{namespace}/{name}"`. The
//! delimiter is the *last* `/` in the URN: `namespace` is an OpenLineage URI
//! and routinely contains its own slashes (`"postgres://host:5432"`), so only
//! `name` is required to be slash-free.

/// Maximum length, in bytes, of a canonicalized dataset URN.
pub const MAX_URN_LEN: usize = 500;

/// Errors produced while canonicalizing a dataset URN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UrnError {
    /// `namespace` was empty.
    #[error("dataset namespace is empty")]
    EmptyNamespace,
    /// `name` was empty.
    #[error("dataset name is empty")]
    EmptyName,
    /// `name` contained a `/` character.
    #[error("dataset name contains '/'")]
    NameContainsSlash,
    /// The canonicalized URN exceeded [`MAX_URN_LEN`] bytes.
    #[error("dataset urn exceeds {MAX_URN_LEN} bytes")]
    TooLong,
}

/// Canonicalizes `namespace` and `name` into a dataset URN.
///
/// # Invariants
/// - Neither segment may be empty; `name` may not contain `/` (`namespace`
///   may, since it is a URI).
/// - The result is at most [`MAX_URN_LEN`] bytes.
///
/// # Errors
/// Returns [`UrnError`] when either segment is empty, `name` contains `/`,
/// or the joined result exceeds [`MAX_URN_LEN`] bytes.
pub fn dataset_urn(namespace: &str, name: &str) -> Result<String, UrnError> {
    if namespace.is_empty() {
        return Err(UrnError::EmptyNamespace);
    }
    if name.is_empty() {
        return Err(UrnError::EmptyName);
    }
    if name.contains('/') {
        return Err(UrnError::NameContainsSlash);
    }
    let urn = format!("{namespace}/{name}");
    if urn.len() > MAX_URN_LEN {
        return Err(UrnError::TooLong);
    }
    Ok(urn)
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
    fn joins_namespace_and_name() {
        assert_eq!(dataset_urn("analytics", "orders").unwrap(), "analytics/orders");
    }

    #[test]
    fn rejects_empty_segments() {
        assert_eq!(dataset_urn("", "orders").unwrap_err(), UrnError::EmptyNamespace);
        assert_eq!(dataset_urn("analytics", "").unwrap_err(), UrnError::EmptyName);
    }

    #[test]
    fn rejects_slash_in_name() {
        assert_eq!(dataset_urn("analytics", "a/b").unwrap_err(), UrnError::NameContainsSlash);
    }

    #[test]
    fn accepts_uri_shaped_namespace_with_slashes() {
        assert_eq!(
            dataset_urn("postgres://prod-db:5432", "raw.public.orders").unwrap(),
            "postgres://prod-db:5432/raw.public.orders"
        );
    }

    #[test]
    fn rejects_urn_over_max_len() {
        let namespace = "n".repeat(MAX_URN_LEN);
        assert_eq!(dataset_urn(&namespace, "x").unwrap_err(), UrnError::TooLong);
    }

    #[test]
    fn accepts_urn_at_max_len() {
        let name = "n".repeat(MAX_URN_LEN - "ns/".len());
        assert!(dataset_urn("ns", &name).is_ok());
    }
}
