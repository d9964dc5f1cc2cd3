//! Error taxonomy for the support pipeline.
//!
//! Startup errors (`MissingContract`, `DuplicateAgent`) are fatal to process
//! initialization. Everything else is request-scoped and is reported to the
//! caller as a [`RequestFailure`] at the pipeline boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contracts::Stage;

/// Result alias used across the coordination crate.
pub type SupportResult<T> = Result<T, SupportError>;

/// Errors raised by contracts, the registry and the stage pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SupportError {
    /// A record failed closed-world or constraint validation.
    #[error("schema violation on `{field}`: {constraint}")]
    SchemaViolation { field: String, constraint: String },

    /// An agent was registered without a declared output contract.
    #[error("agent `{agent}` does not declare an output contract")]
    MissingContract { agent: String },

    /// The same agent name was registered twice.
    #[error("agent `{name}` is registered more than once")]
    DuplicateAgent { name: String },

    /// Lookup of a name that is not in the registry.
    #[error("agent `{name}` is not registered")]
    UnknownAgent { name: String },

    /// Stage output could not be coerced into its declared type.
    ///
    /// Internal only: the coercion layer absorbs it and falls back.
    #[error("{stage} output could not be coerced: {reason}")]
    OutputCoercionFailure { stage: Stage, reason: String },

    /// An external collaborator (reasoning engine, knowledge base) failed.
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },
}

impl SupportError {
    /// Build a schema violation for `field`.
    pub fn schema(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// Wrap a collaborator failure, keeping the full cause chain as text.
    pub fn collaborator(collaborator: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            message: format!("{err:#}"),
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SchemaViolation { .. } => "SCHEMA_VIOLATION",
            Self::MissingContract { .. } => "MISSING_CONTRACT",
            Self::DuplicateAgent { .. } => "DUPLICATE_AGENT",
            Self::UnknownAgent { .. } => "UNKNOWN_AGENT",
            Self::OutputCoercionFailure { .. } => "OUTPUT_COERCION_FAILURE",
            Self::Collaborator { .. } => "COLLABORATOR_FAILURE",
        }
    }

    /// Whether this error must abort process startup.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingContract { .. } | Self::DuplicateAgent { .. }
        )
    }

    /// Classify the error for the caller.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::SchemaViolation { .. } => FailureKind::InvalidInput,
            Self::UnknownAgent { .. } => FailureKind::NotFound,
            Self::Collaborator { .. } => FailureKind::Upstream,
            Self::MissingContract { .. }
            | Self::DuplicateAgent { .. }
            | Self::OutputCoercionFailure { .. } => FailureKind::Internal,
        }
    }
}

/// Caller-facing classification of a request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    NotFound,
    Upstream,
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::NotFound => write!(f, "not_found"),
            Self::Upstream => write!(f, "upstream"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Request-scoped failure reported to the caller.
///
/// ```json
/// {
///   "code": "UNKNOWN_AGENT",
///   "kind": "not_found",
///   "message": "agent `billing_agent` is not registered"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFailure {
    pub code: String,
    pub kind: FailureKind,
    pub message: String,
}

impl From<&SupportError> for RequestFailure {
    fn from(err: &SupportError) -> Self {
        Self {
            code: err.code().to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<SupportError> for RequestFailure {
    fn from(err: SupportError) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RequestFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_display_names_field() {
        let err = SupportError::schema("confidence", "must be within [0.0, 1.0]");
        assert_eq!(
            err.to_string(),
            "schema violation on `confidence`: must be within [0.0, 1.0]"
        );
        assert_eq!(err.code(), "SCHEMA_VIOLATION");
        assert_eq!(err.kind(), FailureKind::InvalidInput);
    }

    #[test]
    fn test_startup_fatal_classification() {
        assert!(SupportError::MissingContract {
            agent: "triage_agent".into()
        }
        .is_startup_fatal());
        assert!(SupportError::DuplicateAgent {
            name: "triage_agent".into()
        }
        .is_startup_fatal());
        assert!(!SupportError::UnknownAgent { name: "x".into() }.is_startup_fatal());
    }

    #[test]
    fn test_request_failure_from_unknown_agent() {
        let failure = RequestFailure::from(SupportError::UnknownAgent {
            name: "billing_agent".into(),
        });
        assert_eq!(failure.code, "UNKNOWN_AGENT");
        assert_eq!(failure.kind, FailureKind::NotFound);
        assert!(failure.message.contains("billing_agent"));
        assert_eq!(
            failure.to_string(),
            "[UNKNOWN_AGENT] agent `billing_agent` is not registered"
        );
    }

    #[test]
    fn test_collaborator_keeps_cause() {
        let err = SupportError::collaborator("knowledge base", "connection refused");
        assert_eq!(err.kind(), FailureKind::Upstream);
        assert_eq!(err.to_string(), "knowledge base failed: connection refused");
    }

    #[test]
    fn test_failure_kind_serde() {
        let json = serde_json::to_string(&FailureKind::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }
}
