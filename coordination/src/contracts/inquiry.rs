//! Inbound inquiry records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{require_text, schema_via_wire, Contract};
use crate::error::{SupportError, SupportResult};

/// Channel the inquiry arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Chat,
    Phone,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Chat => write!(f, "chat"),
            Self::Phone => write!(f, "phone"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "chat" => Ok(Self::Chat),
            "phone" => Ok(Self::Phone),
            other => Err(SupportError::schema(
                "channel",
                format!("`{other}` is not one of email, chat, phone"),
            )),
        }
    }
}

/// Metadata attached to an inquiry. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InquiryMetadataWire")]
pub struct InquiryMetadata {
    channel: Channel,
    customer_id: String,
    customer_history: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct InquiryMetadataWire {
    /// Channel type: email, chat, or phone.
    channel: Channel,
    /// Unique customer identifier.
    customer_id: String,
    /// Summary of customer history if available.
    customer_history: Option<String>,
}

schema_via_wire!(InquiryMetadata, InquiryMetadataWire, "InquiryMetadata");

impl TryFrom<InquiryMetadataWire> for InquiryMetadata {
    type Error = SupportError;

    fn try_from(wire: InquiryMetadataWire) -> SupportResult<Self> {
        Self::new(wire.channel, wire.customer_id, wire.customer_history)
    }
}

impl InquiryMetadata {
    pub fn new(
        channel: Channel,
        customer_id: impl Into<String>,
        customer_history: Option<String>,
    ) -> SupportResult<Self> {
        let customer_id = customer_id.into();
        require_text("customer_id", &customer_id)?;
        Ok(Self {
            channel,
            customer_id,
            customer_history,
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn customer_history(&self) -> Option<&str> {
        self.customer_history.as_deref()
    }
}

impl Contract for InquiryMetadata {
    const NAME: &'static str = "InquiryMetadata";
    const FIELDS: &'static [&'static str] = &["channel", "customer_id", "customer_history"];
}

/// Input to the triage stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TriageRequestWire")]
pub struct TriageRequest {
    inquiry_text: String,
    metadata: InquiryMetadata,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct TriageRequestWire {
    /// Raw inquiry text from the customer.
    inquiry_text: String,
    metadata: InquiryMetadata,
}

schema_via_wire!(TriageRequest, TriageRequestWire, "TriageRequest");

impl TryFrom<TriageRequestWire> for TriageRequest {
    type Error = SupportError;

    fn try_from(wire: TriageRequestWire) -> SupportResult<Self> {
        Self::new(wire.inquiry_text, wire.metadata)
    }
}

impl TriageRequest {
    pub fn new(inquiry_text: impl Into<String>, metadata: InquiryMetadata) -> SupportResult<Self> {
        let inquiry_text = inquiry_text.into();
        require_text("inquiry_text", &inquiry_text)?;
        Ok(Self {
            inquiry_text,
            metadata,
        })
    }

    pub fn inquiry_text(&self) -> &str {
        &self.inquiry_text
    }

    pub fn metadata(&self) -> &InquiryMetadata {
        &self.metadata
    }
}

impl Contract for TriageRequest {
    const NAME: &'static str = "TriageRequest";
    const FIELDS: &'static [&'static str] = &["inquiry_text", "metadata"];
}
