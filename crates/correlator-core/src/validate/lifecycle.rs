// crates/correlator-core/src/validate/lifecycle.rs
// ============================================================================
// Module: Lifecycle Validator
// ============================================================================

//! ## Overview
//! Cross-event sequencing over a batch that shares a single `runId`:
//! stable time-ordering plus a pure state-transition check. The transition
//! table is the single source of truth for what one run-state may become.

use crate::event::EventType;
use crate::event::RunEvent;

/// A rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{reason}: {from} -> {to}")]
pub struct TransitionError {
    /// The index, within the sorted batch, of the event that caused the error.
    pub index: usize,
    /// State being transitioned from.
    pub from: EventType,
    /// State being transitioned to.
    pub to: EventType,
    /// Human-readable category (`"duplicate"`, `"backward"`, or `"terminal"`).
    pub reason: &'static str,
}

/// Stably sorts `events` by parsed `eventTime`.
///
/// Events with an unparseable `eventTime` sort last, in their original
/// relative order; callers are expected to have already run
/// [`crate::validate::field::validate_event`], which rejects those events.
#[must_use]
pub fn sort_by_event_time(mut events: Vec<RunEvent>) -> Vec<RunEvent> {
    events.sort_by_key(|e| e.parsed_event_time().unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC));
    events
}

/// Walks `events` (already sorted by `eventTime`) and checks every
/// transition against the §4.3 table. Only meaningful when every event
/// shares one `runId`; callers gate on `events.len() > 1 && same_run`.
///
/// Seeds the running state from the first event's type and never rejects
/// it. `OTHER` is a metadata carrier: it is always a legal destination and
/// never changes the running state.
///
/// # Errors
/// Returns the first [`TransitionError`] encountered.
pub fn validate_transitions(events: &[RunEvent], same_run: bool) -> Result<(), TransitionError> {
    if !same_run || events.len() < 2 {
        return Ok(());
    }

    let mut current: Option<EventType> = None;
    for (index, event) in events.iter().enumerate() {
        let Some(to) = event.parsed_event_type() else {
            continue;
        };
        let Some(from) = current else {
            current = Some(to);
            continue;
        };

        if let Some(reason) = rejected_reason(from, to) {
            return Err(TransitionError { index, from, to, reason });
        }

        if to != EventType::Other {
            current = Some(to);
        }
    }
    Ok(())
}

/// Checks a single `from -> to` transition against the §4.3 table, for
/// callers (the storage writer) that apply one event to already-stored
/// state rather than walking a batch.
///
/// # Errors
/// Returns the rejection reason (`"duplicate"`, `"backward"`, or
/// `"terminal"`) when the transition is illegal.
pub fn check_transition(from: EventType, to: EventType) -> Result<(), &'static str> {
    match rejected_reason(from, to) {
        Some(reason) => Err(reason),
        None => Ok(()),
    }
}

/// Returns `Some(reason)` when `from -> to` is rejected by the §4.3 table,
/// `None` when it is legal.
fn rejected_reason(from: EventType, to: EventType) -> Option<&'static str> {
    use EventType::{Abort, Complete, Fail, Other, Running, Start};

    if to == Other {
        return None;
    }
    match from {
        Start => (to == Start).then_some("duplicate"),
        Running => (to == Start).then_some("backward"),
        Complete => (to != Complete).then_some("terminal"),
        Fail => (to != Fail).then_some("terminal"),
        Abort => (to != Abort).then_some("terminal"),
        Other => None,
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
    use crate::event::JobRef;
    use crate::event::RunRef;

    fn event(event_type: &str, event_time: &str) -> RunEvent {
        RunEvent {
            event_time: Some(event_time.to_owned()),
            event_type: Some(event_type.to_owned()),
            producer: Some("https://example.com".to_owned()),
            schema_url: Some("https://openlineage.io/spec/2-0-2/OpenLineage.json".to_owned()),
            run: Some(RunRef {
                run_id: Some("550e8400-e29b-41d4-a716-446655440000".to_owned()),
                facets: serde_json::Map::new(),
            }),
            job: Some(JobRef {
                namespace: Some("ns".to_owned()),
                name: Some("job".to_owned()),
                facets: serde_json::Map::new(),
            }),
            inputs: Some(Vec::new()),
            outputs: Some(Vec::new()),
        }
    }

    #[test]
    fn sort_is_stable_on_event_time() {
        let events = vec![
            event("COMPLETE", "2025-01-07T10:05:05Z"),
            event("START", "2025-01-07T10:05:00Z"),
            event("RUNNING", "2025-01-07T10:05:02Z"),
        ];
        let sorted = sort_by_event_time(events);
        let types: Vec<_> = sorted.iter().map(|e| e.parsed_event_type().unwrap()).collect();
        assert_eq!(types, vec![EventType::Start, EventType::Running, EventType::Complete]);
    }

    #[test]
    fn single_event_batch_is_always_ok() {
        let events = vec![event("START", "2025-01-07T10:05:00Z")];
        assert!(validate_transitions(&events, true).is_ok());
    }

    #[test]
    fn multi_run_batch_is_skipped() {
        let events = vec![
            event("COMPLETE", "2025-01-07T10:05:00Z"),
            event("START", "2025-01-07T10:05:01Z"),
        ];
        assert!(validate_transitions(&events, false).is_ok());
    }

    #[test]
    fn start_then_complete_then_running_is_rejected() {
        let events = sort_by_event_time(vec![
            event("START", "2025-01-07T10:00:00Z"),
            event("COMPLETE", "2025-01-07T10:01:00Z"),
            event("RUNNING", "2025-01-07T10:02:00Z"),
        ]);
        let err = validate_transitions(&events, true).unwrap_err();
        assert_eq!(err.from, EventType::Complete);
        assert_eq!(err.to, EventType::Running);
        assert_eq!(err.reason, "terminal");
    }

    #[test]
    fn terminal_self_transition_is_idempotent() {
        let events = sort_by_event_time(vec![
            event("COMPLETE", "2025-01-07T10:00:00Z"),
            event("COMPLETE", "2025-01-07T10:01:00Z"),
        ]);
        assert!(validate_transitions(&events, true).is_ok());
    }

    #[test]
    fn other_never_changes_running_state() {
        let events = sort_by_event_time(vec![
            event("START", "2025-01-07T10:00:00Z"),
            event("OTHER", "2025-01-07T10:01:00Z"),
            event("COMPLETE", "2025-01-07T10:02:00Z"),
        ]);
        assert!(validate_transitions(&events, true).is_ok());
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let events = sort_by_event_time(vec![
            event("START", "2025-01-07T10:00:00Z"),
            event("START", "2025-01-07T10:01:00Z"),
        ]);
        let err = validate_transitions(&events, true).unwrap_err();
        assert_eq!(err.reason, "duplicate");
    }

    #[test]
    fn running_then_start_is_backward() {
        let events = sort_by_event_time(vec![
            event("RUNNING", "2025-01-07T10:00:00Z"),
            event("START", "2025-01-07T10:01:00Z"),
        ]);
        let err = validate_transitions(&events, true).unwrap_err();
        assert_eq!(err.reason, "backward");
    }

    #[test]
    fn final_state_is_order_independent_across_permutations() {
        let base = vec![
            event("START", "2025-01-07T10:00:00Z"),
            event("RUNNING", "2025-01-07T10:01:00Z"),
            event("COMPLETE", "2025-01-07T10:02:00Z"),
        ];
        // arrival order reversed; event-time-ordered replay must agree.
        let reversed: Vec<_> = base.iter().rev().cloned().collect();
        let sorted_a = sort_by_event_time(base);
        let sorted_b = sort_by_event_time(reversed);
        let final_a = sorted_a.last().unwrap().parsed_event_type().unwrap();
        let final_b = sorted_b.last().unwrap().parsed_event_type().unwrap();
        assert_eq!(final_a, final_b);
    }
}
