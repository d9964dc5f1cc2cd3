//! Triage stage output.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{schema_via_wire, Contract, InquiryMetadata};
use crate::error::{SupportError, SupportResult};
use crate::resilience;

/// Confidence below which clarification is mandatory.
pub const CONFIDENCE_GATE: f64 = 0.8;

/// Issue category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technical,
    Billing,
    General,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Technical => write!(f, "technical"),
            Self::Billing => write!(f, "billing"),
            Self::General => write!(f, "general"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "technical" => Ok(Self::Technical),
            "billing" => Ok(Self::Billing),
            "general" => Ok(Self::General),
            other => Err(SupportError::schema(
                "category",
                format!("`{other}` is not one of technical, billing, general"),
            )),
        }
    }
}

/// Ticket priority. Serialized capitalized (`"High"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(SupportError::schema(
                "priority",
                format!("`{other}` is not one of High, Medium, Low"),
            )),
        }
    }
}

/// Classified, prioritized inquiry.
///
/// `clarification_needed` is derived from `confidence` by every constructor
/// (including deserialization) and cannot be set independently. The record
/// is never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TriageResultWire")]
pub struct TriageResult {
    category: Category,
    priority: Priority,
    confidence: f64,
    ticket_metadata: InquiryMetadata,
    clarification_needed: bool,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct TriageResultWire {
    /// Issue category: technical, billing, or general.
    category: Category,
    /// Priority level: High, Medium, or Low.
    priority: Priority,
    /// Confidence score (0.0 - 1.0).
    confidence: f64,
    ticket_metadata: InquiryMetadata,
    /// Whether clarification is needed due to low confidence. Recomputed.
    #[serde(default)]
    clarification_needed: Option<bool>,
}

schema_via_wire!(TriageResult, TriageResultWire, "TriageResult");

impl TryFrom<TriageResultWire> for TriageResult {
    type Error = SupportError;

    fn try_from(wire: TriageResultWire) -> SupportResult<Self> {
        let result = Self::new(
            wire.category,
            wire.priority,
            wire.confidence,
            wire.ticket_metadata,
        )?;
        if let Some(claimed) = wire.clarification_needed {
            if claimed != result.clarification_needed {
                tracing::debug!(
                    claimed,
                    derived = result.clarification_needed,
                    confidence = result.confidence,
                    "Overriding supplied clarification_needed with derived value"
                );
            }
        }
        Ok(result)
    }
}

impl TriageResult {
    /// Build a triage result, deriving `clarification_needed` from the gate.
    pub fn new(
        category: Category,
        priority: Priority,
        confidence: f64,
        ticket_metadata: InquiryMetadata,
    ) -> SupportResult<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(SupportError::schema(
                "confidence",
                format!("{confidence} is outside [0.0, 1.0]"),
            ));
        }
        Ok(Self {
            category,
            priority,
            confidence,
            ticket_metadata,
            clarification_needed: confidence < CONFIDENCE_GATE,
        })
    }

    /// Low-confidence general ticket, used when triage output is unusable.
    pub fn fallback(ticket_metadata: InquiryMetadata) -> Self {
        Self {
            category: Category::General,
            priority: Priority::Low,
            confidence: resilience::DEFAULT_TRIAGE_CONFIDENCE,
            ticket_metadata,
            clarification_needed: true,
        }
    }

    /// Same classification, different metadata.
    pub fn with_metadata(self, ticket_metadata: InquiryMetadata) -> Self {
        Self {
            ticket_metadata,
            ..self
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn ticket_metadata(&self) -> &InquiryMetadata {
        &self.ticket_metadata
    }

    pub fn clarification_needed(&self) -> bool {
        self.clarification_needed
    }
}

impl Contract for TriageResult {
    const NAME: &'static str = "TriageResult";
    const FIELDS: &'static [&'static str] = &[
        "category",
        "priority",
        "confidence",
        "ticket_metadata",
        "clarification_needed",
    ];
}
