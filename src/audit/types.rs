//! Data structures representing audit log records from an export.
//!
//! Each line of a downloaded export is a JSON object. Only four fields are
//! interpreted (`time`, `action`, `status`, `source`); everything else is
//! vendor-specific and kept verbatim in [`AuditRecord::extra`] so records can
//! be echoed back unchanged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Placeholder used when a record lacks one of the aggregated fields.
pub const UNKNOWN: &str = "UNKNOWN";

/// Text form of any JSON value; `null` counts as absent.
///
/// Vendors emit some codes as numbers (e.g. `"status": 0`), which still need
/// to be counted.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// One decoded line of an export.
///
/// # Fields
///
/// - `time`: RFC3339 timestamp of the logged action
/// - `action`: operation name, e.g. `LUNA_SIGN` or `Create Key`
/// - `status`: outcome, e.g. `success`, `LUNA_RET_OK` or an error code
/// - `source`: emitting subsystem, e.g. `cdsp` or `thales/cloudhsm/<serial>`
/// - `extra`: every other field, untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AuditRecord {
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub action: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuditRecord {
    /// Action name, or [`UNKNOWN`]
    pub fn action(&self) -> &str {
        self.action.as_deref().unwrap_or(UNKNOWN)
    }

    /// Status, or [`UNKNOWN`]
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or(UNKNOWN)
    }

    /// Source, or [`UNKNOWN`]
    pub fn source(&self) -> &str {
        self.source.as_deref().unwrap_or(UNKNOWN)
    }

    /// Timestamp if present and non-empty
    pub fn time(&self) -> Option<&str> {
        self.time.as_deref().filter(|t| !t.is_empty())
    }

    /// Actor identifier, when the vendor payload carries one.
    pub fn actor_id(&self) -> Option<&str> {
        self.extra.get("actorId").and_then(Value::as_str)
    }
}
