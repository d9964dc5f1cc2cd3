//! Schema contracts shared by every pipeline stage.
//!
//! Every record is closed-world: an input carrying a field the record does
//! not declare fails construction with [`SupportError::SchemaViolation`]
//! instead of being silently ignored. Records with invariants deserialize
//! through a private wire struct and a checked `TryFrom`, so the only way to
//! obtain a value is through validation.
//!
//! ```text
//! TriageRequest ──► TriageResult ──► ResolutionRequest ──► ResolutionResult
//! MonitoringRequest ─────────────────────────────────────► PerformanceReport
//! ```

/// Implement `JsonSchema` for a validated record by delegating to its wire
/// struct, which carries the closed-world field layout.
macro_rules! schema_via_wire {
    ($ty:ty, $wire:ty, $name:literal) => {
        impl schemars::JsonSchema for $ty {
            fn schema_name() -> String {
                $name.to_string()
            }

            fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
                <$wire as schemars::JsonSchema>::json_schema(gen)
            }
        }
    };
}

pub(crate) use schema_via_wire;

pub mod inquiry;
pub mod monitoring;
pub mod resolution;
pub mod triage;

pub use inquiry::{Channel, InquiryMetadata, TriageRequest};
pub use monitoring::{
    MonitoringRequest, PerformanceMetric, PerformanceReport, SlaTargets, TicketUpdate,
};
pub use resolution::{
    KnowledgeLookupResult, ResolutionInput, ResolutionRequest, ResolutionResult, TicketStatus,
};
pub use triage::{Category, Priority, TriageResult, CONFIDENCE_GATE};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SupportError, SupportResult};

/// A pipeline stage with a fixed input/output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Triage,
    Resolution,
    Monitoring,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Triage => write!(f, "triage"),
            Self::Resolution => write!(f, "resolution"),
            Self::Monitoring => write!(f, "monitoring"),
        }
    }
}

/// A closed-world record type.
pub trait Contract: Serialize + DeserializeOwned + JsonSchema {
    /// Record name used in diagnostics.
    const NAME: &'static str;
    /// Top-level fields the record declares. Anything else is rejected.
    const FIELDS: &'static [&'static str];
}

/// Parse a JSON value into a contract, rejecting undeclared fields.
pub fn parse_contract<T: Contract>(value: Value) -> SupportResult<T> {
    let Value::Object(map) = &value else {
        return Err(SupportError::schema(
            T::NAME,
            format!("expected an object, got {}", json_type(&value)),
        ));
    };

    if let Some(extra) = map.keys().find(|key| !T::FIELDS.contains(&key.as_str())) {
        return Err(SupportError::schema(
            extra.clone(),
            format!("unrecognized field for {}", T::NAME),
        ));
    }

    serde_json::from_value(value).map_err(|e| violation_from_serde(T::NAME, &e))
}

/// Parse JSON text into a contract.
pub fn parse_contract_str<T: Contract>(text: &str) -> SupportResult<T> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| SupportError::schema(T::NAME, format!("invalid JSON: {e}")))?;
    parse_contract(value)
}

/// Map a serde error onto a schema violation, recovering the field name
/// when serde (or one of our `TryFrom` conversions) reports it.
pub(crate) fn violation_from_serde(record: &str, err: &serde_json::Error) -> SupportError {
    let message = err.to_string();

    if let Some(rest) = message.strip_prefix("schema violation on `") {
        if let Some((field, constraint)) = rest.split_once("`: ") {
            return SupportError::schema(field, constraint);
        }
    }

    for prefix in ["unknown field `", "missing field `"] {
        if let Some(field) = message
            .strip_prefix(prefix)
            .and_then(|rest| rest.split('`').next())
        {
            return SupportError::schema(field, message.clone());
        }
    }

    SupportError::schema(record, message)
}

/// Short name of a JSON value's type, for diagnostics.
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reject blank text fields.
pub(crate) fn require_text(field: &str, value: &str) -> SupportResult<()> {
    if value.trim().is_empty() {
        return Err(SupportError::schema(field, "must not be empty"));
    }
    Ok(())
}
