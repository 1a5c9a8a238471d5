// crates/correlator-http/src/routes/ingest.rs
// ============================================================================
// Module: Ingestion Handler
// ============================================================================

//! ## Overview
//! `POST /api/v1/lineage/events`. Decodes a JSON array of RunEvents,
//! normalizes and aliases each one, runs field validation independently,
//! then (for a single-run batch of two or more) lifecycle validation over
//! the event-time-sorted batch, then calls the storage writer per event
//! that passed validation. Never aborts the batch on one event's failure.

use axum::body::Bytes;
use axum::extract::Extension;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use correlator_core::alias::AliasConfig;
use correlator_core::event::DatasetRef;
use correlator_core::validate::field::validate_event;
use correlator_core::validate::lifecycle::validate_transitions;
use correlator_core::RunEvent;
use correlator_store::store_event;
use correlator_store::StoreError;
use correlator_store::StoreOutcome;

use crate::middleware::CorrelationId;
use crate::problem::Problem;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct IngestResponse {
    status: &'static str,
    summary: Summary,
    results: Vec<EventResult>,
    correlation_id: String,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct Summary {
    total: usize,
    stored: usize,
    duplicates: usize,
    failed: usize,
}

#[derive(Debug, Serialize)]
struct EventResult {
    index: usize,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Handles `POST /api/v1/lineage/events` per the §4.11 contract.
pub async fn ingest_events(
    State(state): State<AppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    body: Bytes,
) -> Response {
    let correlation_id = correlation_id.0;

    if body.is_empty() {
        return Problem::bad_request("request body must not be empty", correlation_id).into_response();
    }

    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(error) => {
            return Problem::bad_request(format!("malformed JSON: {error}"), correlation_id).into_response();
        }
    };

    let serde_json::Value::Array(items) = value else {
        return Problem::bad_request(
            "request body must be a JSON array of events, not a single object",
            correlation_id,
        )
        .into_response();
    };

    if items.is_empty() {
        return Problem::bad_request("event array must not be empty", correlation_id).into_response();
    }

    let mut events = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RunEvent>(item) {
            Ok(mut event) => {
                event.normalize();
                apply_aliasing(&mut event, &state.alias_config);
                events.push(event);
            }
            Err(error) => {
                return Problem::bad_request(format!("malformed event: {error}"), correlation_id)
                    .into_response();
            }
        }
    }

    let mut field_errors: Vec<Option<String>> = vec![None; events.len()];
    for (index, event) in events.iter().enumerate() {
        if let Err(error) = validate_event(event) {
            field_errors[index] = Some(error.to_string());
        }
    }

    let run_ids: Vec<Option<Uuid>> = events.iter().map(RunEvent::parsed_run_id).collect();
    let same_run = events.len() >= 2 && run_ids[0].is_some() && run_ids.iter().all(|id| *id == run_ids[0]);

    if same_run {
        let mut pairs: Vec<(usize, RunEvent)> = events.iter().cloned().enumerate().collect();
        pairs.sort_by_key(|(_, event)| {
            event.parsed_event_time().unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
        });
        let sorted_events: Vec<RunEvent> = pairs.iter().map(|(_, event)| event.clone()).collect();

        if let Err(transition_error) = validate_transitions(&sorted_events, true) {
            let (offending_index, _) = pairs[transition_error.index];
            field_errors[offending_index].get_or_insert_with(|| transition_error.to_string());
        }
    }

    let mut results = Vec::with_capacity(events.len());
    let mut stored = 0usize;
    let mut duplicates = 0usize;
    let mut failed = 0usize;

    for (index, event) in events.iter().enumerate() {
        if let Some(message) = &field_errors[index] {
            failed += 1;
            results.push(EventResult { index, status: 422, message: None, error: Some(message.clone()) });
            continue;
        }

        match store_event(&state.pool, event).await {
            Ok(StoreOutcome::Stored) => {
                stored += 1;
                results.push(EventResult { index, status: 200, message: Some("stored"), error: None });
            }
            Ok(StoreOutcome::Duplicate) => {
                duplicates += 1;
                results.push(EventResult { index, status: 200, message: Some("duplicate"), error: None });
            }
            Err(StoreError::Database(db_error)) => {
                failed += 1;
                tracing::error!(correlation_id = %correlation_id, error = %db_error, "storage write failed");
                results.push(EventResult {
                    index,
                    status: 500,
                    message: None,
                    error: Some("storage write failed".to_owned()),
                });
            }
            Err(other) => {
                failed += 1;
                results.push(EventResult { index, status: 422, message: None, error: Some(other.to_string()) });
            }
        }
    }

    let (status, status_code) = if failed == 0 {
        ("success", StatusCode::OK)
    } else if stored + duplicates > 0 {
        ("partial", StatusCode::MULTI_STATUS)
    } else {
        ("error", StatusCode::UNPROCESSABLE_ENTITY)
    };

    let body = IngestResponse {
        status,
        summary: Summary { total: events.len(), stored, duplicates, failed },
        results,
        correlation_id,
        timestamp: Utc::now().to_rfc3339(),
    };

    (status_code, Json(body)).into_response()
}

/// Rewrites every dataset's namespace/name in `event` via `alias_config`,
/// splitting the resolved `"{namespace}/{name}"` URN back into its parts.
fn apply_aliasing(event: &mut RunEvent, alias_config: &AliasConfig) {
    if let Some(inputs) = event.inputs.as_mut() {
        inputs.iter_mut().for_each(|dataset| alias_dataset(dataset, alias_config));
    }
    if let Some(outputs) = event.outputs.as_mut() {
        outputs.iter_mut().for_each(|dataset| alias_dataset(dataset, alias_config));
    }
}

/// `name` is required to be slash-free (see [`correlator_core::urn::dataset_urn`]),
/// but `namespace` is a URI and routinely contains its own slashes
/// (`"postgres://prod-db:5432"`), so the split must anchor on the *last*
/// `/`, not the first.
fn alias_dataset(dataset: &mut DatasetRef, alias_config: &AliasConfig) {
    let namespace = dataset.namespace.clone().unwrap_or_default();
    let name = dataset.name.clone().unwrap_or_default();
    let resolved = alias_config.resolve(&namespace, &name);
    if let Some((resolved_namespace, resolved_name)) = resolved.rsplit_once('/') {
        dataset.namespace = Some(resolved_namespace.to_owned());
        dataset.name = Some(resolved_name.to_owned());
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
    fn alias_dataset_rewrites_namespace_and_name() {
        let mut config = AliasConfig::identity();
        config.namespace_aliases.insert("dbt://demo".to_owned(), "postgresql://demo".to_owned());
        let mut dataset =
            DatasetRef { namespace: Some("dbt://demo".to_owned()), name: Some("orders".to_owned()), ..Default::default() };
        alias_dataset(&mut dataset, &config);
        assert_eq!(dataset.namespace.as_deref(), Some("postgresql://demo"));
        assert_eq!(dataset.name.as_deref(), Some("orders"));
    }

    #[test]
    fn apply_aliasing_identity_leaves_datasets_unchanged() {
        let mut event = RunEvent {
            inputs: Some(vec![DatasetRef {
                namespace: Some("ns".to_owned()),
                name: Some("name".to_owned()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        apply_aliasing(&mut event, &AliasConfig::identity());
        let input = &event.inputs.expect("inputs present")[0];
        assert_eq!(input.namespace.as_deref(), Some("ns"));
        assert_eq!(input.name.as_deref(), Some("name"));
    }

    /// A real OpenLineage namespace is a URI and contains its own `//`; the
    /// alias/URN split must anchor on the last `/`, not the first, or a
    /// dataset like `postgres://prod-db:5432/raw.public.orders` gets torn
    /// apart into a mangled namespace and an unparseable name.
    #[test]
    fn apply_aliasing_preserves_uri_shaped_namespace_for_dataset_urn() {
        let mut event = RunEvent {
            inputs: Some(vec![DatasetRef {
                namespace: Some("postgres://prod-db:5432".to_owned()),
                name: Some("raw.public.orders".to_owned()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        apply_aliasing(&mut event, &AliasConfig::identity());
        let input = &event.inputs.expect("inputs present")[0];
        assert_eq!(input.namespace.as_deref(), Some("postgres://prod-db:5432"));
        assert_eq!(input.name.as_deref(), Some("raw.public.orders"));

        let urn = correlator_core::urn::dataset_urn(
            input.namespace.as_deref().expect("namespace present"),
            input.name.as_deref().expect("name present"),
        )
        .expect("real namespace/name must canonicalize");
        assert_eq!(urn, "postgres://prod-db:5432/raw.public.orders");
    }
}
