// crates/correlator-core/src/assertions.rs
// ============================================================================
// Module: Data-Quality Assertion Extraction
// ============================================================================

//! ## Overview
//! Pure extraction of the `dataQualityAssertions` facet shape from a
//! dataset's `inputFacets` map. The storage writer calls this per input
//! dataset on every event and persists the result best-effort: a malformed
//! facet here must never fail the surrounding event.

use serde_json::Map;
use serde_json::Value;

/// One extracted assertion, ready to become a `TestResult` row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedAssertion {
    /// The assertion's name, e.g. `"not_null_order_id"`.
    pub assertion: String,
    /// Whether the assertion passed.
    pub success: bool,
    /// The column the assertion targeted, if any.
    pub column: Option<String>,
}

/// Extracts every assertion from `input_facets.dataQualityAssertions.assertions`.
///
/// Returns an empty vector when the facet, or any of its nested keys, is
/// absent or not shaped as expected — there is no error case; extraction is
/// best-effort by design (§4.5 step 8).
#[must_use]
pub fn extract_assertions(input_facets: &Map<String, Value>) -> Vec<ExtractedAssertion> {
    let Some(assertions) = input_facets
        .get("dataQualityAssertions")
        .and_then(Value::as_object)
        .and_then(|facet| facet.get("assertions"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    assertions.iter().filter_map(parse_one).collect()
}

fn parse_one(value: &Value) -> Option<ExtractedAssertion> {
    let obj = value.as_object()?;
    let assertion = obj.get("assertion")?.as_str()?.to_owned();
    let success = obj.get("success")?.as_bool()?;
    let column = obj.get("column").and_then(Value::as_str).map(str::to_owned);
    Some(ExtractedAssertion { assertion, success, column })
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted to unwrap."
    )]
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_documented_shape() {
        let facets: Map<String, Value> = serde_json::from_value(json!({
            "dataQualityAssertions": {
                "assertions": [
                    {"assertion": "not_null_order_id", "success": false, "column": "order_id"},
                    {"assertion": "unique_id", "success": true}
                ]
            }
        }))
        .unwrap();

        let extracted = extract_assertions(&facets);
        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].assertion, "not_null_order_id");
        assert!(!extracted[0].success);
        assert_eq!(extracted[0].column.as_deref(), Some("order_id"));
        assert!(extracted[1].success);
        assert_eq!(extracted[1].column, None);
    }

    #[test]
    fn missing_facet_yields_empty() {
        assert!(extract_assertions(&Map::new()).is_empty());
    }

    #[test]
    fn malformed_assertion_entry_is_skipped_not_fatal() {
        let facets: Map<String, Value> = serde_json::from_value(json!({
            "dataQualityAssertions": {
                "assertions": [
                    {"assertion": "ok_one", "success": true},
                    {"success": true},
                    "not even an object"
                ]
            }
        }))
        .unwrap();

        let extracted = extract_assertions(&facets);
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].assertion, "ok_one");
    }
}
