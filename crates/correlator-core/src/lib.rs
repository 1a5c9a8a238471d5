// crates/correlator-core/src/lib.rs
// ============================================================================
// Crate: correlator-core
// ============================================================================

//! Pure validation, canonicalization, and lifecycle logic for OpenLineage
//! RunEvents. Every function in this crate is free of I/O: no database, no
//! network, no clock reads beyond parsing timestamps already present on an
//! event. Higher layers (`correlator-store`, `correlator-http`) call into
//! this crate rather than re-implementing any of it.

pub mod alias;
pub mod assertions;
pub mod error;
pub mod event;
pub mod idempotency;
pub mod urn;
pub mod validate;

pub use error::CoreError;
pub use event::DatasetRef;
pub use event::EventType;
pub use event::JobRef;
pub use event::RunEvent;
pub use event::RunRef;
pub use idempotency::idempotency_key;
pub use urn::dataset_urn;
