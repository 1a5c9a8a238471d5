// crates/correlator-core/src/error.rs
// ============================================================================
// Module: Core Error
// ============================================================================

//! Aggregate error type over the pure validation layers, for callers (the
//! HTTP handler, the storage writer) that need one type to match on rather
//! than threading three independently.

use crate::urn::UrnError;
use crate::validate::field::FieldError;
use crate::validate::lifecycle::TransitionError;

/// Union of everything the pure validation/canonicalization layers can
/// reject.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A dataset URN failed canonicalization.
    #[error("invalid dataset urn: {0}")]
    Urn(#[from] UrnError),
    /// An event failed a mandatory field check.
    #[error("invalid event field: {0}")]
    Field(#[from] FieldError),
    /// A run's event sequence violated the transition table.
    #[error("invalid state transition: {0}")]
    Transition(#[from] TransitionError),
}
