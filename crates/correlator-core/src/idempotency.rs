// crates/correlator-core/src/idempotency.rs
// ============================================================================
// Module: Idempotency Key
// ============================================================================

//! ## Overview
//! Computes the stable 64-hex-char idempotency key for a [`RunEvent`], used
//! both by the HTTP handler (pre-write dedup signal) and the storage writer
//! (primary key of `idempotency_records`).

use sha2::Digest;
use sha2::Sha256;

use crate::event::RunEvent;

/// Separator byte appended after every keyed field. Not valid in any of the
/// six fields (producer/namespace/name are URI- or identifier-shaped;
/// `runId`, `eventTime`, `eventType` are UUID/RFC-3339/enum strings).
const FIELD_SEPARATOR: u8 = 0x1f;

/// Computes the idempotency key for `event`.
///
/// Hashes, in fixed order, `producer`, `job.namespace`, `job.name`,
/// `run.runId`, `eventTime`, and `eventType`, each terminated by
/// [`FIELD_SEPARATOR`]. Missing fields hash as the empty string, so this
/// function never fails; callers are expected to have already run field
/// validation, which rejects events where any of these six fields is absent.
///
/// # Invariants
/// - Stable across serialization round-trips of an unchanged event.
/// - Differs if any of the six fields differs by a single byte.
#[must_use]
pub fn idempotency_key(event: &RunEvent) -> String {
    let mut hasher = Sha256::new();
    let fields = [
        event.producer.as_deref().unwrap_or(""),
        event.job.as_ref().and_then(|j| j.namespace.as_deref()).unwrap_or(""),
        event.job.as_ref().and_then(|j| j.name.as_deref()).unwrap_or(""),
        event.run.as_ref().and_then(|r| r.run_id.as_deref()).unwrap_or(""),
        event.event_time.as_deref().unwrap_or(""),
        event.event_type.as_deref().unwrap_or(""),
    ];
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([FIELD_SEPARATOR]);
    }
    encode_hex(&hasher.finalize())
}

fn encode_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted to unwrap."
    )]
    use super::*;
    use crate::event::JobRef;
    use crate::event::RunRef;

    fn sample() -> RunEvent {
        RunEvent {
            event_time: Some("2025-01-07T10:05:00Z".to_owned()),
            event_type: Some("COMPLETE".to_owned()),
            producer: Some("https://example.com/dbt-core/1.5.0".to_owned()),
            schema_url: Some("https://openlineage.io/spec/2-0-2/OpenLineage.json".to_owned()),
            run: Some(RunRef {
                run_id: Some("550e8400-e29b-41d4-a716-446655440000".to_owned()),
                facets: serde_json::Map::new(),
            }),
            job: Some(JobRef {
                namespace: Some("dbt://analytics".to_owned()),
                name: Some("transform_orders".to_owned()),
                facets: serde_json::Map::new(),
            }),
            inputs: Some(Vec::new()),
            outputs: Some(Vec::new()),
        }
    }

    #[test]
    fn stable_across_clones() {
        let event = sample();
        assert_eq!(idempotency_key(&event), idempotency_key(&event.clone()));
    }

    #[test]
    fn produces_64_hex_chars() {
        let key = idempotency_key(&sample());
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn differs_on_event_time_change() {
        let mut changed = sample();
        changed.event_time = Some("2025-01-07T10:05:01Z".to_owned());
        assert_ne!(idempotency_key(&sample()), idempotency_key(&changed));
    }

    #[test]
    fn differs_on_each_keyed_field() {
        let base = idempotency_key(&sample());

        let mut producer = sample();
        producer.producer = Some("https://example.com/other".to_owned());
        assert_ne!(base, idempotency_key(&producer));

        let mut namespace = sample();
        namespace.job.as_mut().unwrap().namespace = Some("dbt://other".to_owned());
        assert_ne!(base, idempotency_key(&namespace));

        let mut name = sample();
        name.job.as_mut().unwrap().name = Some("other_job".to_owned());
        assert_ne!(base, idempotency_key(&name));

        let mut run_id = sample();
        run_id.run.as_mut().unwrap().run_id = Some("00000000-0000-0000-0000-000000000000".to_owned());
        assert_ne!(base, idempotency_key(&run_id));

        let mut event_type = sample();
        event_type.event_type = Some("FAIL".to_owned());
        assert_ne!(base, idempotency_key(&event_type));
    }

    #[test]
    fn ignores_facets() {
        let mut with_facets = sample();
        with_facets.run.as_mut().unwrap().facets.insert("x".to_owned(), serde_json::json!(1));
        assert_eq!(idempotency_key(&sample()), idempotency_key(&with_facets));
    }
}
