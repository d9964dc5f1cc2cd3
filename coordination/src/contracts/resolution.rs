//! Resolution stage records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{require_text, schema_via_wire, Contract, TriageResult};
use crate::error::{SupportError, SupportResult};
use crate::resilience;

/// Disposition of a ticket after the resolution stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TicketStatus {
    #[serde(rename = "resolved")]
    Resolved,
    #[serde(rename = "escalated")]
    Escalated,
    #[serde(rename = "pending further action")]
    Pending,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved => write!(f, "resolved"),
            Self::Escalated => write!(f, "escalated"),
            Self::Pending => write!(f, "pending further action"),
        }
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(|c: char| c == '_' || c == '-', " ");
        match normalized.as_str() {
            "resolved" => Ok(Self::Resolved),
            "escalated" => Ok(Self::Escalated),
            "pending further action" | "pending" => Ok(Self::Pending),
            other => Err(SupportError::schema(
                "ticket_status",
                format!("`{other}` is not one of resolved, escalated, pending further action"),
            )),
        }
    }
}

/// Customer-facing resolution or escalation.
///
/// `escalation_channel` is present exactly when `ticket_status` is
/// [`TicketStatus::Escalated`]. Use [`ResolutionResult::resolved`],
/// [`ResolutionResult::escalated`] or [`ResolutionResult::pending`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ResolutionResultWire")]
pub struct ResolutionResult {
    resolution_reply: String,
    ticket_status: TicketStatus,
    resolution_notes: Option<String>,
    escalation_channel: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct ResolutionResultWire {
    /// Detailed reply for the customer.
    resolution_reply: String,
    /// Ticket status: resolved, escalated, pending further action.
    ticket_status: TicketStatus,
    /// Any notes about the resolution or escalation.
    #[serde(default)]
    resolution_notes: Option<String>,
    /// Channel used for escalation, if any (e.g. Slack).
    #[serde(default)]
    escalation_channel: Option<String>,
}

schema_via_wire!(ResolutionResult, ResolutionResultWire, "ResolutionResult");

impl TryFrom<ResolutionResultWire> for ResolutionResult {
    type Error = SupportError;

    fn try_from(wire: ResolutionResultWire) -> SupportResult<Self> {
        Self::new(
            wire.resolution_reply,
            wire.ticket_status,
            wire.resolution_notes,
            wire.escalation_channel,
        )
    }
}

impl ResolutionResult {
    /// Build a result, checking the status/channel pairing.
    pub fn new(
        resolution_reply: impl Into<String>,
        ticket_status: TicketStatus,
        resolution_notes: Option<String>,
        escalation_channel: Option<String>,
    ) -> SupportResult<Self> {
        let resolution_reply = resolution_reply.into();
        require_text("resolution_reply", &resolution_reply)?;

        let escalation_channel = escalation_channel.filter(|c| !c.trim().is_empty());
        match (ticket_status, &escalation_channel) {
            (TicketStatus::Escalated, None) => {
                return Err(SupportError::schema(
                    "escalation_channel",
                    "required when ticket_status is escalated",
                ))
            }
            (TicketStatus::Resolved | TicketStatus::Pending, Some(_)) => {
                return Err(SupportError::schema(
                    "escalation_channel",
                    format!("must be absent when ticket_status is {ticket_status}"),
                ))
            }
            _ => {}
        }

        Ok(Self {
            resolution_reply,
            ticket_status,
            resolution_notes,
            escalation_channel,
        })
    }

    pub fn resolved(reply: impl Into<String>, notes: Option<String>) -> SupportResult<Self> {
        Self::new(reply, TicketStatus::Resolved, notes, None)
    }

    pub fn escalated(
        reply: impl Into<String>,
        notes: Option<String>,
        channel: impl Into<String>,
    ) -> SupportResult<Self> {
        Self::new(reply, TicketStatus::Escalated, notes, Some(channel.into()))
    }

    pub fn pending(reply: impl Into<String>, notes: Option<String>) -> SupportResult<Self> {
        Self::new(reply, TicketStatus::Pending, notes, None)
    }

    /// Pending result used when resolution output is unusable.
    pub fn fallback() -> Self {
        Self {
            resolution_reply: resilience::UNRESOLVED_REPLY.to_string(),
            ticket_status: TicketStatus::Pending,
            resolution_notes: Some(resilience::PARSING_ERROR_NOTE.to_string()),
            escalation_channel: None,
        }
    }

    /// Convert into an escalation on `channel`, keeping reply and notes.
    pub fn escalate(self, channel: impl Into<String>) -> SupportResult<Self> {
        Self::new(
            self.resolution_reply,
            TicketStatus::Escalated,
            self.resolution_notes,
            Some(channel.into()),
        )
    }

    pub fn resolution_reply(&self) -> &str {
        &self.resolution_reply
    }

    pub fn ticket_status(&self) -> TicketStatus {
        self.ticket_status
    }

    pub fn resolution_notes(&self) -> Option<&str> {
        self.resolution_notes.as_deref()
    }

    pub fn escalation_channel(&self) -> Option<&str> {
        self.escalation_channel.as_deref()
    }

    pub fn is_escalated(&self) -> bool {
        self.ticket_status == TicketStatus::Escalated
    }
}

impl Contract for ResolutionResult {
    const NAME: &'static str = "ResolutionResult";
    const FIELDS: &'static [&'static str] = &[
        "resolution_reply",
        "ticket_status",
        "resolution_notes",
        "escalation_channel",
    ];
}

/// Input to the resolution stage: a validated triage result plus the
/// original inquiry text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResolutionRequestWire")]
pub struct ResolutionRequest {
    ticket: TriageResult,
    inquiry_text: String,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct ResolutionRequestWire {
    ticket: TriageResult,
    /// Original inquiry text from the customer.
    inquiry_text: String,
}

schema_via_wire!(ResolutionRequest, ResolutionRequestWire, "ResolutionRequest");

impl TryFrom<ResolutionRequestWire> for ResolutionRequest {
    type Error = SupportError;

    fn try_from(wire: ResolutionRequestWire) -> SupportResult<Self> {
        Self::new(wire.ticket, wire.inquiry_text)
    }
}

impl ResolutionRequest {
    pub fn new(ticket: TriageResult, inquiry_text: impl Into<String>) -> SupportResult<Self> {
        let inquiry_text = inquiry_text.into();
        require_text("inquiry_text", &inquiry_text)?;
        Ok(Self {
            ticket,
            inquiry_text,
        })
    }

    pub fn ticket(&self) -> &TriageResult {
        &self.ticket
    }

    pub fn inquiry_text(&self) -> &str {
        &self.inquiry_text
    }
}

impl Contract for ResolutionRequest {
    const NAME: &'static str = "ResolutionRequest";
    const FIELDS: &'static [&'static str] = &["ticket", "inquiry_text"];
}

/// What the resolution agent is invoked with: the request, the knowledge
/// lookup evidence gathered for it, and the channel misses escalate to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ResolutionInput {
    pub ticket: TriageResult,
    /// Original inquiry text from the customer.
    pub inquiry_text: String,
    /// Result of the knowledge base search for `inquiry_text`.
    pub knowledge_lookup: KnowledgeLookupResult,
    /// Channel to escalate to when no article was found.
    pub escalation_channel: String,
}

impl ResolutionInput {
    pub fn new(
        request: &ResolutionRequest,
        knowledge_lookup: KnowledgeLookupResult,
        escalation_channel: impl Into<String>,
    ) -> Self {
        Self {
            ticket: request.ticket().clone(),
            inquiry_text: request.inquiry_text().to_string(),
            knowledge_lookup,
            escalation_channel: escalation_channel.into(),
        }
    }
}

impl Contract for ResolutionInput {
    const NAME: &'static str = "ResolutionInput";
    const FIELDS: &'static [&'static str] =
        &["ticket", "inquiry_text", "knowledge_lookup", "escalation_channel"];
}

/// Output of the knowledge-base tool agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeLookupResult {
    /// Article text, or the no-article sentinel.
    pub result: String,
}

impl Contract for KnowledgeLookupResult {
    const NAME: &'static str = "KnowledgeLookupResult";
    const FIELDS: &'static [&'static str] = &["result"];
}
