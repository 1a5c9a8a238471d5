// crates/correlator-http/src/routes/query.rs
// ============================================================================
// Module: Correlation Query Handlers
// ============================================================================

//! ## Overview
//! `GET /api/v1/incidents` and `GET /api/v1/impact/{runId}`, layered
//! directly over `correlator-projections`'s read operations.

use axum::extract::Extension;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use correlator_projections::query_incidents;
use correlator_projections::query_lineage_impact;
use correlator_projections::Impact;
use correlator_projections::Incident;
use correlator_projections::IncidentFilter;

use crate::middleware::CorrelationId;
use crate::problem::Problem;
use crate::state::AppState;

/// Query-string parameters accepted by `GET /api/v1/incidents`.
#[derive(Debug, Deserialize, Default)]
pub struct IncidentsQuery {
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    status: Option<String>,
    job_namespace: Option<String>,
}

#[derive(Debug, Serialize)]
struct IncidentBody {
    test_result_id: i64,
    test_name: String,
    dataset_urn: String,
    test_status: String,
    incident_time: DateTime<Utc>,
    root_cause_run_id: Uuid,
    job_namespace: String,
    job_name: String,
    root_cause_state: String,
}

impl From<Incident> for IncidentBody {
    fn from(incident: Incident) -> Self {
        Self {
            test_result_id: incident.test_result_id,
            test_name: incident.test_name,
            dataset_urn: incident.dataset_urn,
            test_status: incident.test_status,
            incident_time: incident.incident_time,
            root_cause_run_id: incident.root_cause_run_id,
            job_namespace: incident.job_namespace,
            job_name: incident.job_name,
            root_cause_state: incident.root_cause_state,
        }
    }
}

/// Handles `GET /api/v1/incidents`.
pub async fn list_incidents(
    State(state): State<AppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    Query(query): Query<IncidentsQuery>,
) -> Response {
    let filter = IncidentFilter {
        since: query.since,
        until: query.until,
        status: query.status,
        job_namespace: query.job_namespace,
    };

    match query_incidents(&state.pool, &filter).await {
        Ok(incidents) => {
            let body: Vec<IncidentBody> = incidents.into_iter().map(IncidentBody::from).collect();
            Json(body).into_response()
        }
        Err(error) => {
            tracing::error!(correlation_id = %correlation_id.0, %error, "incident query failed");
            Problem::internal_error(correlation_id.0).into_response()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ImpactQuery {
    #[serde(default = "default_max_depth")]
    max_depth: i32,
}

const fn default_max_depth() -> i32 {
    5
}

#[derive(Debug, Serialize)]
struct ImpactBody {
    source_dataset: String,
    downstream_dataset_count: i64,
    downstream_job_count: i64,
    max_depth: i32,
    sample: Vec<String>,
}

impl From<Impact> for ImpactBody {
    fn from(impact: Impact) -> Self {
        Self {
            source_dataset: impact.source_dataset,
            downstream_dataset_count: impact.downstream_dataset_count,
            downstream_job_count: impact.downstream_job_count,
            max_depth: impact.max_depth,
            sample: impact.sample,
        }
    }
}

/// Handles `GET /api/v1/impact/{runId}`.
pub async fn lineage_impact(
    State(state): State<AppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    Path(run_id): Path<Uuid>,
    Query(query): Query<ImpactQuery>,
) -> Response {
    match query_lineage_impact(&state.pool, run_id, query.max_depth).await {
        Ok(impact) => {
            let body: Vec<ImpactBody> = impact.into_iter().map(ImpactBody::from).collect();
            Json(body).into_response()
        }
        Err(error) => {
            tracing::error!(correlation_id = %correlation_id.0, %error, "impact query failed");
            Problem::internal_error(correlation_id.0).into_response()
        }
    }
}
