// crates/correlator-store/src/writer.rs
// ============================================================================
// Module: Transactional Storage Writer
// ============================================================================

//! ## Overview
//! `store_event` is the single public write path: one event in, one
//! transaction out. Every step of §4.5 runs inside it — idempotency
//! short-circuit, run-state upsert under a row lock, dataset/edge upserts,
//! and best-effort assertion extraction — and nothing partial is ever
//! visible to a reader.

use chrono::DateTime;
use chrono::Utc;
use correlator_core::assertions::extract_assertions;
use correlator_core::dataset_urn;
use correlator_core::event::DatasetRef;
use correlator_core::event::EventType;
use correlator_core::idempotency_key;
use correlator_core::validate::lifecycle::check_transition;
use correlator_core::RunEvent;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::error::StoreError;
use crate::error::StoreOutcome;

/// Applies one already-field-validated event to the store.
///
/// # Errors
/// See [`StoreError`]. A [`StoreError::Database`] is safe to retry; the
/// other variants indicate the event itself is invalid and retrying
/// unchanged will fail the same way.
pub async fn store_event(pool: &PgPool, event: &RunEvent) -> Result<StoreOutcome, StoreError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET CONSTRAINTS ALL DEFERRED").execute(&mut *tx).await?;

    let key = idempotency_key(event);
    let inserted = sqlx::query(
        "INSERT INTO idempotency_records (key, expires_at) \
         VALUES ($1, now() + interval '24 hours') \
         ON CONFLICT (key) DO NOTHING",
    )
    .bind(&key)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        tx.commit().await?;
        return Ok(StoreOutcome::Duplicate);
    }

    let run_id = event.parsed_run_id().ok_or(StoreError::Unvalidated("run.runId"))?;
    let incoming_type = event.parsed_event_type().ok_or(StoreError::Unvalidated("eventType"))?;
    let incoming_time = event.parsed_event_time().ok_or(StoreError::Unvalidated("eventTime"))?;

    apply_run_state(&mut tx, run_id, event, incoming_type, incoming_time).await?;
    upsert_datasets_and_edges(&mut tx, run_id, event).await?;
    extract_and_store_assertions(&mut tx, run_id, event).await;

    tx.commit().await?;
    Ok(StoreOutcome::Stored)
}

struct CurrentRun {
    current_state: EventType,
    event_time: DateTime<Utc>,
    state_history: Value,
}

async fn apply_run_state(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    run_id: Uuid,
    event: &RunEvent,
    incoming_type: EventType,
    incoming_time: DateTime<Utc>,
) -> Result<(), StoreError> {
    let existing = sqlx::query(
        "SELECT current_state, event_time, state_history FROM job_runs WHERE run_id = $1 FOR UPDATE",
    )
    .bind(run_id)
    .fetch_optional(&mut **tx)
    .await?
    .map(row_to_current_run)
    .transpose()?;

    let job_namespace = event.job.as_ref().and_then(|j| j.namespace.as_deref()).unwrap_or_default();
    let job_name = event.job.as_ref().and_then(|j| j.name.as_deref()).unwrap_or_default();
    let producer = event.producer.as_deref().unwrap_or_default();

    let Some(existing) = existing else {
        let history = serde_json::json!([history_entry(None, incoming_type, incoming_time)]);
        sqlx::query(
            "INSERT INTO job_runs \
             (run_id, job_namespace, job_name, current_state, event_time, state_history, producer_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(run_id)
        .bind(job_namespace)
        .bind(job_name)
        .bind(incoming_type.as_wire())
        .bind(incoming_time)
        .bind(history)
        .bind(producer)
        .execute(&mut **tx)
        .await?;
        return Ok(());
    };

    if incoming_time < existing.event_time {
        // Out-of-order: record to history, leave current_state/event_time untouched.
        let history = append_history(
            existing.state_history,
            history_entry(Some(existing.current_state), existing.current_state, incoming_time),
        );
        sqlx::query("UPDATE job_runs SET state_history = $2 WHERE run_id = $1")
            .bind(run_id)
            .bind(history)
            .execute(&mut **tx)
            .await?;
        return Ok(());
    }

    if let Err(reason) = check_transition(existing.current_state, incoming_type) {
        return Err(StoreError::TransitionRejected {
            from: existing.current_state,
            to: incoming_type,
            reason,
        });
    }

    let new_state = if incoming_type == EventType::Other { existing.current_state } else { incoming_type };
    let history =
        append_history(existing.state_history, history_entry(Some(existing.current_state), incoming_type, incoming_time));
    sqlx::query(
        "UPDATE job_runs SET current_state = $2, event_time = $3, state_history = $4 WHERE run_id = $1",
    )
    .bind(run_id)
    .bind(new_state.as_wire())
    .bind(incoming_time)
    .bind(history)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn row_to_current_run(row: PgRow) -> Result<CurrentRun, StoreError> {
    let raw_state: String = row.try_get("current_state")?;
    let current_state = EventType::parse(&raw_state).unwrap_or(EventType::Other);
    Ok(CurrentRun {
        current_state,
        event_time: row.try_get("event_time")?,
        state_history: row.try_get("state_history")?,
    })
}

fn history_entry(from: Option<EventType>, to: EventType, event_time: DateTime<Utc>) -> Value {
    serde_json::json!({
        "from": from.map(EventType::as_wire),
        "to": to.as_wire(),
        "event_time": event_time.to_rfc3339(),
        "wall_time": Utc::now().to_rfc3339(),
    })
}

fn append_history(existing: Value, entry: Value) -> Value {
    let mut history = match existing {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    history.push(entry);
    Value::Array(history)
}

async fn upsert_datasets_and_edges(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    run_id: Uuid,
    event: &RunEvent,
) -> Result<(), StoreError> {
    let inputs = event.inputs.as_deref().unwrap_or_default();
    let outputs = event.outputs.as_deref().unwrap_or_default();

    for dataset in inputs {
        upsert_dataset_and_edge(tx, run_id, dataset, "input").await?;
    }
    for dataset in outputs {
        upsert_dataset_and_edge(tx, run_id, dataset, "output").await?;
    }
    Ok(())
}

async fn upsert_dataset_and_edge(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    run_id: Uuid,
    dataset: &DatasetRef,
    edge_type: &'static str,
) -> Result<(), StoreError> {
    let namespace = dataset.namespace.as_deref().unwrap_or_default();
    let name = dataset.name.as_deref().unwrap_or_default();
    let urn = dataset_urn(namespace, name)?;

    sqlx::query(
        "INSERT INTO datasets (urn, namespace, name, facets) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (urn) DO UPDATE SET facets = datasets.facets || EXCLUDED.facets, updated_at = now()",
    )
    .bind(&urn)
    .bind(namespace)
    .bind(name)
    .bind(Value::Object(dataset.facets.clone()))
    .execute(&mut **tx)
    .await?;

    let edge_facets = if edge_type == "input" { &dataset.input_facets } else { &dataset.output_facets };
    sqlx::query(
        "INSERT INTO lineage_edges (run_id, dataset_urn, edge_type, facets) VALUES ($1, $2, $3, $4)",
    )
    .bind(run_id)
    .bind(&urn)
    .bind(edge_type)
    .bind(Value::Object(edge_facets.clone()))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn extract_and_store_assertions(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    run_id: Uuid,
    event: &RunEvent,
) {
    let Some(event_time) = event.parsed_event_time() else { return };
    let inputs = event.inputs.as_deref().unwrap_or_default();

    for dataset in inputs {
        let namespace = dataset.namespace.as_deref().unwrap_or_default();
        let name = dataset.name.as_deref().unwrap_or_default();
        let Ok(urn) = dataset_urn(namespace, name) else { continue };

        for assertion in extract_assertions(&dataset.input_facets) {
            let status = if assertion.success { "passed" } else { "failed" };
            let result = sqlx::query(
                "INSERT INTO test_results \
                 (test_name, dataset_urn, run_id, status, column_name, executed_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&assertion.assertion)
            .bind(&urn)
            .bind(run_id)
            .bind(status)
            .bind(assertion.column.as_deref())
            .bind(event_time)
            .execute(&mut **tx)
            .await;

            if let Err(error) = result {
                tracing::warn!(%error, dataset_urn = %urn, "assertion extraction failed, continuing");
            }
        }
    }
}
