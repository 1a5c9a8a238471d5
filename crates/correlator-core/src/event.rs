// crates/correlator-core/src/event.rs
// ============================================================================
// Module: RunEvent Wire Types
// Description: In-flight representation of an OpenLineage RunEvent.
// Purpose: Decode permissively; defer semantic checks to the field validator.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! `RunEvent` mirrors the OpenLineage 2-0-2 wire shape but keeps every field
//! optional or raw (`String` rather than a parsed type) so that a missing or
//! malformed attribute surfaces as a [`crate::validate::field`] error rather
//! than a JSON-decode failure. Only the envelope shape (array of objects)
//! is enforced at decode time; everything else is opaque until validated.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// The six OpenLineage run event types, plus the non-standard catch-all.
///
/// # Invariants
/// - `OTHER` never changes run state (see [`crate::validate::lifecycle`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Run has started.
    Start,
    /// Run is in progress.
    Running,
    /// Run completed successfully.
    Complete,
    /// Run failed.
    Fail,
    /// Run was aborted.
    Abort,
    /// Metadata-carrier event; never changes run state.
    Other,
}

impl EventType {
    /// All six variants, in wire order.
    pub const ALL: [Self; 6] =
        [Self::Start, Self::Running, Self::Complete, Self::Fail, Self::Abort, Self::Other];

    /// Parses the OpenLineage wire form (`"START"`, `"RUNNING"`, ...).
    ///
    /// Case-sensitive: OpenLineage producers emit uppercase event types.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "START" => Some(Self::Start),
            "RUNNING" => Some(Self::Running),
            "COMPLETE" => Some(Self::Complete),
            "FAIL" => Some(Self::Fail),
            "ABORT" => Some(Self::Abort),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }

    /// Returns the OpenLineage wire form.
    #[must_use]
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Fail => "FAIL",
            Self::Abort => "ABORT",
            Self::Other => "OTHER",
        }
    }

    /// Returns true when this event type is one of the three terminal states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Fail | Self::Abort)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// `run` object on the wire: `{ runId, facets? }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRef {
    /// Raw `runId` string, unparsed (validated separately as a UUID).
    #[serde(rename = "runId", default)]
    pub run_id: Option<String>,
    /// Opaque run-level facets.
    #[serde(default)]
    pub facets: Map<String, Value>,
}

/// `job` object on the wire: `{ namespace, name, facets? }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRef {
    /// Job namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Job name.
    #[serde(default)]
    pub name: Option<String>,
    /// Opaque job-level facets.
    #[serde(default)]
    pub facets: Map<String, Value>,
}

/// A dataset reference on the wire: `{ namespace, name, facets?, inputFacets?, outputFacets? }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetRef {
    /// Dataset namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Dataset name.
    #[serde(default)]
    pub name: Option<String>,
    /// Opaque dataset facets, merged into storage on every sighting.
    #[serde(default)]
    pub facets: Map<String, Value>,
    /// Facets that only apply when this dataset is an input (e.g.
    /// `dataQualityAssertions`).
    #[serde(rename = "inputFacets", default)]
    pub input_facets: Map<String, Value>,
    /// Facets that only apply when this dataset is an output.
    #[serde(rename = "outputFacets", default)]
    pub output_facets: Map<String, Value>,
}

/// An in-flight OpenLineage RunEvent, decoded permissively.
///
/// # Invariants
/// - No field is validated at decode time; see [`crate::validate::field::validate_event`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunEvent {
    /// Raw `eventTime`, unparsed (RFC 3339 expected, validated separately).
    #[serde(rename = "eventTime", default)]
    pub event_time: Option<String>,
    /// Raw `eventType`, unparsed (validated against [`EventType::parse`]).
    #[serde(rename = "eventType", default)]
    pub event_type: Option<String>,
    /// Producer URI string.
    #[serde(default)]
    pub producer: Option<String>,
    /// OpenLineage schema URL.
    #[serde(rename = "schemaURL", default)]
    pub schema_url: Option<String>,
    /// Run reference.
    #[serde(default)]
    pub run: Option<RunRef>,
    /// Job reference.
    #[serde(default)]
    pub job: Option<JobRef>,
    /// Input datasets. `None` means the key was absent from the wire payload.
    #[serde(default)]
    pub inputs: Option<Vec<DatasetRef>>,
    /// Output datasets. `None` means the key was absent from the wire payload.
    #[serde(default)]
    pub outputs: Option<Vec<DatasetRef>>,
}

impl RunEvent {
    /// Parses [`Self::event_time`] as an RFC 3339 instant.
    #[must_use]
    pub fn parsed_event_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let raw = self.event_time.as_deref()?;
        chrono::DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&chrono::Utc))
    }

    /// Parses [`Self::event_type`] via [`EventType::parse`].
    #[must_use]
    pub fn parsed_event_type(&self) -> Option<EventType> {
        EventType::parse(self.event_type.as_deref()?)
    }

    /// Parses `run.runId` as a UUID of any version.
    #[must_use]
    pub fn parsed_run_id(&self) -> Option<uuid::Uuid> {
        uuid::Uuid::parse_str(self.run.as_ref()?.run_id.as_deref()?).ok()
    }

    /// Replaces `None` input/output arrays with empty vectors, matching the
    /// ingestion handler's normalization step (§4.11 step 2).
    pub fn normalize(&mut self) {
        if self.inputs.is_none() {
            self.inputs = Some(Vec::new());
        }
        if self.outputs.is_none() {
            self.outputs = Some(Vec::new());
        }
    }
}
