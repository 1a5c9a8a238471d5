// crates/correlator-store/src/error.rs
// ============================================================================
// Module: Store Error
// ============================================================================

use correlator_core::event::EventType;
use correlator_core::urn::UrnError;

/// The outcome of a successful [`crate::writer::store_event`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The event was new and applied.
    Stored,
    /// The event's idempotency key was already present; no mutation occurred.
    Duplicate,
}

/// Everything [`crate::writer::store_event`] can fail with.
///
/// Transient database errors are returned unchanged so the caller may retry;
/// everything else is a terminal 422 as far as the HTTP layer is concerned.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A transient or unexpected database error. Safe to retry.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A dataset referenced by the event failed canonicalization.
    #[error("invalid dataset urn: {0}")]
    Urn(#[from] UrnError),
    /// The event's transition was rejected by the §4.3 table.
    #[error("transition rejected ({reason}): {from} -> {to}")]
    TransitionRejected {
        /// State transitioned from.
        from: EventType,
        /// State transitioned to.
        to: EventType,
        /// Rejection category (`"duplicate"`, `"backward"`, `"terminal"`).
        reason: &'static str,
    },
    /// A mandatory field was missing or unparseable despite having passed
    /// field validation upstream; indicates a caller bypassed validation.
    #[error("event field {0} missing or unparseable at store time")]
    Unvalidated(&'static str),
}
