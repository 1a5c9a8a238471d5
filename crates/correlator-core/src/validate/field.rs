// crates/correlator-core/src/validate/field.rs
// ============================================================================
// Module: Field Validator
// ============================================================================

//! ## Overview
//! Per-event semantic checks. Pure, allocation-light, and independent of any
//! other event in a batch — see [`crate::validate::lifecycle`] for the
//! cross-event sequencing layer.

use crate::event::RunEvent;

/// A single field-validation failure.
///
/// # Invariants
/// - `field` always names the offending attribute using its wire path
///   (e.g. `"job.namespace"`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct FieldError {
    /// Wire-path of the offending field, e.g. `"run.runId"`.
    pub field: &'static str,
    /// Human-readable reason, safe to surface to API callers.
    pub reason: &'static str,
}

impl FieldError {
    const fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

/// Runs every mandatory field check against `event` and returns the first
/// failure encountered, in the order the checks are listed in §4.2.
///
/// Facet contents are never inspected here; they are opaque until the
/// storage writer's assertion extractor looks at well-known keys.
///
/// # Errors
/// Returns [`FieldError`] naming the first offending field.
pub fn validate_event(event: &RunEvent) -> Result<(), FieldError> {
    check_event_time(event)?;
    check_event_type(event)?;
    check_producer(event)?;
    check_schema_url(event)?;
    check_run_id(event)?;
    check_job(event)?;
    check_datasets(event)?;
    Ok(())
}

fn check_event_time(event: &RunEvent) -> Result<(), FieldError> {
    match event.event_time.as_deref() {
        None | Some("") => Err(FieldError::new("eventTime", "missing")),
        Some(_) => match event.parsed_event_time() {
            Some(parsed) if parsed.timestamp() != 0 || parsed.timestamp_subsec_nanos() != 0 => {
                Ok(())
            }
            Some(_) => Err(FieldError::new("eventTime", "must be non-zero")),
            None => Err(FieldError::new("eventTime", "not a valid RFC 3339 timestamp")),
        },
    }
}

fn check_event_type(event: &RunEvent) -> Result<(), FieldError> {
    match event.event_type.as_deref() {
        None | Some("") => Err(FieldError::new("eventType", "missing")),
        Some(_) => {
            if event.parsed_event_type().is_some() {
                Ok(())
            } else {
                Err(FieldError::new(
                    "eventType",
                    "must be one of START, RUNNING, COMPLETE, FAIL, ABORT, OTHER",
                ))
            }
        }
    }
}

fn check_producer(event: &RunEvent) -> Result<(), FieldError> {
    match event.producer.as_deref() {
        Some(p) if !p.is_empty() => Ok(()),
        _ => Err(FieldError::new("producer", "must be non-empty")),
    }
}

/// Accepts any non-empty URL-shaped string, including one carrying an
/// `#/$defs/...` fragment reference; the fragment is never interpreted.
fn check_schema_url(event: &RunEvent) -> Result<(), FieldError> {
    match event.schema_url.as_deref() {
        Some(url) if !url.is_empty() && url.contains("://") => Ok(()),
        _ => Err(FieldError::new("schemaURL", "must be a non-empty schema URL")),
    }
}

fn check_run_id(event: &RunEvent) -> Result<(), FieldError> {
    let run_id = event.run.as_ref().and_then(|r| r.run_id.as_deref());
    match run_id {
        None | Some("") => Err(FieldError::new("run.runId", "missing")),
        Some(_) => {
            if event.parsed_run_id().is_some() {
                Ok(())
            } else {
                Err(FieldError::new("run.runId", "not a valid UUID"))
            }
        }
    }
}

fn check_job(event: &RunEvent) -> Result<(), FieldError> {
    let job = event.job.as_ref();
    match job.and_then(|j| j.namespace.as_deref()) {
        Some(ns) if !ns.is_empty() => {}
        _ => return Err(FieldError::new("job.namespace", "must be non-empty")),
    }
    match job.and_then(|j| j.name.as_deref()) {
        Some(name) if !name.is_empty() => Ok(()),
        _ => Err(FieldError::new("job.name", "must be non-empty")),
    }
}

fn check_datasets(event: &RunEvent) -> Result<(), FieldError> {
    if event.inputs.is_none() {
        return Err(FieldError::new("inputs", "must be an array, not absent"));
    }
    if event.outputs.is_none() {
        return Err(FieldError::new("outputs", "must be an array, not absent"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted to unwrap."
    )]
    use super::*;
    use crate::event::DatasetRef;
    use crate::event::JobRef;
    use crate::event::RunRef;

    fn valid_event() -> RunEvent {
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
            inputs: Some(vec![DatasetRef {
                namespace: Some("postgres://prod-db:5432".to_owned()),
                name: Some("raw.public.orders".to_owned()),
                ..Default::default()
            }]),
            outputs: Some(Vec::new()),
        }
    }

    #[test]
    fn accepts_fully_populated_event() {
        assert!(validate_event(&valid_event()).is_ok());
    }

    #[test]
    fn rejects_missing_event_time() {
        let mut event = valid_event();
        event.event_time = None;
        let err = validate_event(&event).unwrap_err();
        assert_eq!(err.field, "eventTime");
    }

    #[test]
    fn rejects_unknown_event_type() {
        let mut event = valid_event();
        event.event_type = Some("BOGUS".to_owned());
        assert_eq!(validate_event(&event).unwrap_err().field, "eventType");
    }

    #[test]
    fn accepts_schema_url_with_defs_fragment() {
        let mut event = valid_event();
        event.schema_url =
            Some("https://openlineage.io/spec/2-0-2/OpenLineage.json#/$defs/RunEvent".to_owned());
        assert!(validate_event(&event).is_ok());
    }

    #[test]
    fn rejects_malformed_run_id() {
        let mut event = valid_event();
        event.run.as_mut().unwrap().run_id = Some("not-a-uuid".to_owned());
        assert_eq!(validate_event(&event).unwrap_err().field, "run.runId");
    }

    #[test]
    fn accepts_uuid_v4_and_v7() {
        let mut v4 = valid_event();
        v4.run.as_mut().unwrap().run_id = Some(uuid::Uuid::new_v4().to_string());
        assert!(validate_event(&v4).is_ok());
    }

    #[test]
    fn rejects_empty_job_fields() {
        let mut event = valid_event();
        event.job.as_mut().unwrap().namespace = Some(String::new());
        assert_eq!(validate_event(&event).unwrap_err().field, "job.namespace");
    }

    #[test]
    fn rejects_absent_inputs() {
        let mut event = valid_event();
        event.inputs = None;
        assert_eq!(validate_event(&event).unwrap_err().field, "inputs");
    }

    #[test]
    fn accepts_empty_inputs_array() {
        let mut event = valid_event();
        event.inputs = Some(Vec::new());
        assert!(validate_event(&event).is_ok());
    }
}
