//! Resilience: stage output coercion and recovery
//!
//! Reasoning engines are untrusted: a stage may come back with a typed
//! record, a loose JSON mapping, or free text with JSON buried somewhere in
//! it. [`coerce`] turns any of these into the stage's declared record and
//! never fails. Each step down the chain is logged.
//!
//! ```text
//! RawOutput
//!   ├─ Record of the right type              → Typed
//!   ├─ Mapping / JSON in text, valid contract → Parsed
//!   ├─ map-like value, some fields usable     → Reconstructed
//!   └─ nothing usable                         → Defaulted (stage safe default)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contracts::{
    json_type, parse_contract, Category, Contract, InquiryMetadata, KnowledgeLookupResult,
    PerformanceMetric, PerformanceReport, Priority, ResolutionResult, SlaTargets, Stage,
    TicketStatus, TriageResult,
};
use crate::error::{SupportError, SupportResult};

/// Fallback reply when no usable resolution came back.
pub const UNRESOLVED_REPLY: &str = "Unable to resolve at this time.";
/// Notes attached to a defaulted resolution.
pub const PARSING_ERROR_NOTE: &str = "Parsing error.";
/// Confidence assigned to a defaulted triage.
pub const DEFAULT_TRIAGE_CONFIDENCE: f64 = 0.5;

/// A fully typed stage result, as produced by an in-process engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageRecord {
    Triage(TriageResult),
    Resolution(ResolutionResult),
    Monitoring(PerformanceReport),
    Knowledge(KnowledgeLookupResult),
}

/// Whatever a reasoning engine handed back.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    Record(StageRecord),
    Mapping(Map<String, Value>),
    Text(String),
}

impl RawOutput {
    /// Best-effort JSON view, used for generic agent runs.
    pub fn into_value(self) -> Value {
        match self {
            Self::Record(record) => serde_json::to_value(record).unwrap_or_default(),
            Self::Mapping(map) => Value::Object(map),
            Self::Text(text) => extract_json_block(&text)
                .and_then(|block| serde_json::from_str(block).ok())
                .unwrap_or(Value::String(text)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Record(_) => "record",
            Self::Mapping(_) => "mapping",
            Self::Text(_) => "text",
        }
    }
}

/// How a coerced value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPath {
    Typed,
    Parsed,
    Reconstructed,
    Defaulted,
}

impl std::fmt::Display for CoercionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Typed => write!(f, "typed"),
            Self::Parsed => write!(f, "parsed"),
            Self::Reconstructed => write!(f, "reconstructed"),
            Self::Defaulted => write!(f, "defaulted"),
        }
    }
}

/// A coerced stage result with the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced<T> {
    pub value: T,
    pub path: CoercionPath,
    /// Failures encountered on the way, in order.
    pub issues: Vec<String>,
}

impl<T> Coerced<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self.path, CoercionPath::Reconstructed | CoercionPath::Defaulted)
    }
}

/// A stage result type the coercion layer knows how to recover.
pub trait StageOutput: Contract + Sized {
    const STAGE: Stage;

    /// Request-derived data needed for reconstruction and defaults.
    type Context: ?Sized;

    /// Take the record if it is of this stage's type.
    fn from_record(record: StageRecord) -> Option<Self>;

    /// Rebuild from a loose mapping, filling unusable fields from the
    /// safe default. Fails when no declared field is usable.
    fn reconstruct(map: &Map<String, Value>, ctx: &Self::Context) -> SupportResult<Self>;

    /// Documented stage fallback.
    fn safe_default(ctx: &Self::Context) -> Self;
}

/// Coerce raw engine output into `T`. Never fails.
pub fn coerce<T: StageOutput>(raw: RawOutput, ctx: &T::Context) -> Coerced<T> {
    let stage = T::STAGE;
    let kind = raw.kind();
    let mut issues = Vec::new();

    let map = match raw {
        RawOutput::Record(record) => match T::from_record(record) {
            Some(value) => {
                tracing::debug!(stage = %stage, path = %CoercionPath::Typed, "Stage output accepted");
                return Coerced {
                    value,
                    path: CoercionPath::Typed,
                    issues,
                };
            }
            None => {
                issues.push(format!("record is not a {}", T::NAME));
                None
            }
        },
        RawOutput::Mapping(map) => Some(map),
        RawOutput::Text(text) => match extract_json_block(&text) {
            None => {
                issues.push("no JSON object found in text output".to_string());
                None
            }
            Some(block) => match serde_json::from_str::<Value>(block) {
                Ok(Value::Object(map)) => Some(map),
                Ok(other) => {
                    issues.push(format!("expected an object, got {}", json_type(&other)));
                    None
                }
                Err(e) => {
                    issues.push(format!("invalid JSON: {e}"));
                    None
                }
            },
        },
    };

    if let Some(map) = map {
        match parse_contract::<T>(Value::Object(map.clone())) {
            Ok(value) => {
                tracing::debug!(stage = %stage, source = kind, path = %CoercionPath::Parsed, "Stage output parsed");
                return Coerced {
                    value,
                    path: CoercionPath::Parsed,
                    issues,
                };
            }
            Err(e) => issues.push(e.to_string()),
        }

        match T::reconstruct(&map, ctx) {
            Ok(value) => {
                tracing::info!(
                    stage = %stage,
                    source = kind,
                    path = %CoercionPath::Reconstructed,
                    issues = ?issues,
                    "Stage output reconstructed field by field"
                );
                return Coerced {
                    value,
                    path: CoercionPath::Reconstructed,
                    issues,
                };
            }
            Err(e) => issues.push(e.to_string()),
        }
    }

    tracing::warn!(
        stage = %stage,
        source = kind,
        path = %CoercionPath::Defaulted,
        issues = ?issues,
        "Stage output unusable, substituting safe default"
    );
    Coerced {
        value: T::safe_default(ctx),
        path: CoercionPath::Defaulted,
        issues,
    }
}

/// Find the JSON payload in free text: a fenced ```json block, any fenced
/// block, or the first `{` that opens a complete JSON object.
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = start + "```json".len();
        if let Some(end) = text[body..].find("```") {
            return Some(text[body..body + end].trim());
        }
    }

    if let Some(start) = text.find("```") {
        let body = start + 3;
        if let Some(end) = text[body..].find("```") {
            let inner = text[body..body + end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    text.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(_))) => Some(&text[start..start + stream.byte_offset()]),
            _ => None,
        }
    })
}

fn coercion_failure(stage: Stage, reason: impl Into<String>) -> SupportError {
    SupportError::OutputCoercionFailure {
        stage,
        reason: reason.into(),
    }
}

fn text_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Accept 0.0–1.0, a percentage up to 100, or either as a string.
fn lenient_confidence(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok()?,
        _ => return None,
    };
    match raw {
        c if (0.0..=1.0).contains(&c) => Some(c),
        c if c > 1.0 && c <= 100.0 => Some(c / 100.0),
        _ => None,
    }
}

impl StageOutput for TriageResult {
    const STAGE: Stage = Stage::Triage;
    type Context = InquiryMetadata;

    fn from_record(record: StageRecord) -> Option<Self> {
        match record {
            StageRecord::Triage(result) => Some(result),
            _ => None,
        }
    }

    fn reconstruct(map: &Map<String, Value>, metadata: &InquiryMetadata) -> SupportResult<Self> {
        let category = text_field(map, "category").and_then(|s| s.parse::<Category>().ok());
        let priority = text_field(map, "priority").and_then(|s| s.parse::<Priority>().ok());
        let confidence = map.get("confidence").and_then(lenient_confidence);

        if category.is_none() && priority.is_none() && confidence.is_none() {
            return Err(coercion_failure(
                Stage::Triage,
                "none of category, priority, confidence is usable",
            ));
        }

        TriageResult::new(
            category.unwrap_or(Category::General),
            priority.unwrap_or(Priority::Low),
            confidence.unwrap_or(DEFAULT_TRIAGE_CONFIDENCE),
            metadata.clone(),
        )
    }

    fn safe_default(metadata: &InquiryMetadata) -> Self {
        TriageResult::fallback(metadata.clone())
    }
}

impl StageOutput for ResolutionResult {
    const STAGE: Stage = Stage::Resolution;
    /// Escalation channel used when an escalated reply names none.
    type Context = str;

    fn from_record(record: StageRecord) -> Option<Self> {
        match record {
            StageRecord::Resolution(result) => Some(result),
            _ => None,
        }
    }

    fn reconstruct(map: &Map<String, Value>, channel: &str) -> SupportResult<Self> {
        let reply = text_field(map, "resolution_reply");
        let status = text_field(map, "ticket_status").and_then(|s| s.parse::<TicketStatus>().ok());
        let notes = text_field(map, "resolution_notes").map(str::to_string);

        if reply.is_none() && status.is_none() {
            return Err(coercion_failure(
                Stage::Resolution,
                "neither resolution_reply nor ticket_status is usable",
            ));
        }

        let reply = reply.unwrap_or(UNRESOLVED_REPLY);
        match status.unwrap_or(TicketStatus::Pending) {
            TicketStatus::Escalated => {
                let channel = text_field(map, "escalation_channel").unwrap_or(channel);
                ResolutionResult::escalated(reply, notes, channel)
            }
            TicketStatus::Resolved => ResolutionResult::resolved(reply, notes),
            TicketStatus::Pending => ResolutionResult::pending(reply, notes),
        }
    }

    fn safe_default(_channel: &str) -> Self {
        ResolutionResult::fallback()
    }
}

impl StageOutput for PerformanceReport {
    const STAGE: Stage = Stage::Monitoring;
    type Context = SlaTargets;

    fn from_record(record: StageRecord) -> Option<Self> {
        match record {
            StageRecord::Monitoring(report) => Some(report),
            _ => None,
        }
    }

    fn reconstruct(map: &Map<String, Value>, targets: &SlaTargets) -> SupportResult<Self> {
        let Some(entries) = map.get("metrics").and_then(Value::as_array) else {
            return Err(coercion_failure(Stage::Monitoring, "no metrics array"));
        };

        let metrics: Vec<PerformanceMetric> = entries
            .iter()
            .filter_map(|entry| {
                let name = entry.get("metric_name").and_then(Value::as_str)?;
                let value = entry.get("value").and_then(Value::as_f64)?;
                Some(PerformanceMetric::new(name, value))
            })
            .collect();

        if metrics.is_empty() && !entries.is_empty() {
            return Err(coercion_failure(Stage::Monitoring, "no usable metric entries"));
        }
        Ok(PerformanceReport::evaluate(metrics, targets))
    }

    fn safe_default(_targets: &SlaTargets) -> Self {
        PerformanceReport::unavailable("monitoring output could not be parsed")
    }
}
