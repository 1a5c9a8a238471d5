// crates/correlator-projections/src/lib.rs
// ============================================================================
// Crate: correlator-projections
// ============================================================================

//! Correlation projections: materialized-view refresh and the three read
//! operations layered over them. Refresh runs concurrently so query
//! handlers never block behind it.

use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

/// Failures refreshing or querying the correlation projections.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One row of `incident_correlation`.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    /// Identity of the underlying `TestResult`.
    pub test_result_id: i64,
    /// The failing assertion's name.
    pub test_name: String,
    /// URN of the dataset the assertion ran against.
    pub dataset_urn: String,
    /// `"failed"` or `"error"`.
    pub test_status: String,
    /// When the incident was observed.
    pub incident_time: DateTime<Utc>,
    /// The run believed to have produced the failing dataset.
    pub root_cause_run_id: Uuid,
    /// That run's job namespace.
    pub job_namespace: String,
    /// That run's job name.
    pub job_name: String,
    /// That run's current state.
    pub root_cause_state: String,
}

/// Filter for [`query_incidents`].
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    /// Only incidents at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only incidents at or before this instant.
    pub until: Option<DateTime<Utc>>,
    /// Only incidents whose test status matches exactly, e.g. `"failed"`.
    pub status: Option<String>,
    /// Only incidents whose root-cause job namespace matches exactly.
    pub job_namespace: Option<String>,
}

/// One row of `lineage_impact`.
#[derive(Debug, Clone, PartialEq)]
pub struct Impact {
    /// The dataset whose downstream footprint this summarizes.
    pub source_dataset: String,
    /// Count of distinct datasets reachable downstream.
    pub downstream_dataset_count: i64,
    /// Count of distinct jobs reachable downstream.
    pub downstream_job_count: i64,
    /// Deepest reachable hop, capped at 5.
    pub max_depth: i32,
    /// A sample (up to 10) of reachable dataset URNs.
    pub sample: Vec<String>,
}

/// One row of `recent_incidents`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentIncidentSummary {
    /// The hour this bucket summarizes.
    pub bucket_hour: DateTime<Utc>,
    /// Incident count in that hour.
    pub incident_count: i64,
}

/// Refreshes all three projections, in dependency order
/// (`incident_correlation` before `recent_incidents`, which derives from
/// it; `lineage_impact` has no such dependency).
///
/// # Errors
/// Returns [`ProjectionError`] on any refresh failure. Each `REFRESH` runs
/// `CONCURRENTLY`, which requires the unique index each view's migration
/// creates.
pub async fn refresh_views(pool: &PgPool) -> Result<(), ProjectionError> {
    sqlx::query("REFRESH MATERIALIZED VIEW CONCURRENTLY incident_correlation").execute(pool).await?;
    sqlx::query("REFRESH MATERIALIZED VIEW CONCURRENTLY lineage_impact").execute(pool).await?;
    sqlx::query("REFRESH MATERIALIZED VIEW CONCURRENTLY recent_incidents").execute(pool).await?;
    Ok(())
}

/// Queries `incident_correlation`, applying `filter`.
///
/// # Errors
/// Returns [`ProjectionError`] on a database error.
pub async fn query_incidents(
    pool: &PgPool,
    filter: &IncidentFilter,
) -> Result<Vec<Incident>, ProjectionError> {
    let mut builder = sqlx::QueryBuilder::new(
        "SELECT test_result_id, test_name, dataset_urn, test_status, incident_time, \
         root_cause_run_id, job_namespace, job_name, root_cause_state \
         FROM incident_correlation WHERE 1 = 1",
    );

    if let Some(since) = filter.since {
        builder.push(" AND incident_time >= ").push_bind(since);
    }
    if let Some(until) = filter.until {
        builder.push(" AND incident_time <= ").push_bind(until);
    }
    if let Some(status) = &filter.status {
        builder.push(" AND test_status = ").push_bind(status.clone());
    }
    if let Some(namespace) = &filter.job_namespace {
        builder.push(" AND job_namespace = ").push_bind(namespace.clone());
    }
    builder.push(" ORDER BY incident_time DESC");

    let rows = builder.build().fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_incident).collect())
}

fn row_to_incident(row: &sqlx::postgres::PgRow) -> Incident {
    Incident {
        test_result_id: row.get("test_result_id"),
        test_name: row.get("test_name"),
        dataset_urn: row.get("dataset_urn"),
        test_status: row.get("test_status"),
        incident_time: row.get("incident_time"),
        root_cause_run_id: row.get("root_cause_run_id"),
        job_namespace: row.get("job_namespace"),
        job_name: row.get("job_name"),
        root_cause_state: row.get("root_cause_state"),
    }
}

/// Queries downstream impact of every dataset `run_id` produced, capped at
/// `max_depth` hops (the view itself is capped at 5; a smaller `max_depth`
/// filters further).
///
/// # Errors
/// Returns [`ProjectionError`] on a database error.
pub async fn query_lineage_impact(
    pool: &PgPool,
    run_id: Uuid,
    max_depth: i32,
) -> Result<Vec<Impact>, ProjectionError> {
    let rows = sqlx::query(
        "SELECT li.source_dataset, li.downstream_dataset_count, li.downstream_job_count, \
         li.max_depth, li.sample \
         FROM lineage_impact li \
         JOIN lineage_edges le ON le.dataset_urn = li.source_dataset \
         WHERE le.run_id = $1 AND le.edge_type = 'output' AND li.max_depth <= $2",
    )
    .bind(run_id)
    .bind(max_depth)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Impact {
            source_dataset: row.get("source_dataset"),
            downstream_dataset_count: row.get("downstream_dataset_count"),
            downstream_job_count: row.get("downstream_job_count"),
            max_depth: row.get("max_depth"),
            sample: row.get("sample"),
        })
        .collect())
}

/// Queries the most recent `limit` hourly buckets from `recent_incidents`.
///
/// # Errors
/// Returns [`ProjectionError`] on a database error.
pub async fn query_recent_incidents(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<RecentIncidentSummary>, ProjectionError> {
    let rows = sqlx::query(
        "SELECT bucket_hour, incident_count FROM recent_incidents ORDER BY bucket_hour DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| RecentIncidentSummary {
            bucket_hour: row.get("bucket_hour"),
            incident_count: row.get("incident_count"),
        })
        .collect())
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
    fn incident_filter_default_has_no_constraints() {
        let filter = IncidentFilter::default();
        assert!(filter.since.is_none());
        assert!(filter.until.is_none());
        assert!(filter.status.is_none());
        assert!(filter.job_namespace.is_none());
    }
}
