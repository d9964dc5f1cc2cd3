//! Support Coordination Library
//!
//! Deterministic core of the customer-support agent pipeline:
//! - Closed-world schema contracts for every stage record
//! - An immutable agent registry with startup-time contract validation
//! - Output coercion that recovers typed records from untrusted engine output
//! - SLA breach evaluation and dashboard rendering over pluggable metric sources
//!
//! No I/O happens here; engines, knowledge bases and transport live in the
//! `support-agents` crate.
//!
//! # Pipeline
//!
//! ```text
//! TriageRequest ─► triage_agent ─► TriageResult ─┐
//!                                                ├─► resolution_agent ─► ResolutionResult
//!                         knowledge lookup ──────┘
//! MonitoringRequest ─► MetricSource ─► sla::find_breaches ─► PerformanceReport
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod contracts;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod resilience;
pub mod sla;

pub use contracts::{
    json_type, parse_contract, parse_contract_str, Category, Channel, Contract, InquiryMetadata,
    KnowledgeLookupResult, MonitoringRequest, PerformanceMetric, PerformanceReport, Priority,
    ResolutionInput, ResolutionRequest, ResolutionResult, SlaTargets, Stage, TicketStatus,
    TicketUpdate, TriageRequest, TriageResult, CONFIDENCE_GATE,
};
pub use error::{FailureKind, RequestFailure, SupportError, SupportResult};
pub use metrics::{EventMetricSource, MetricSource};
pub use registry::{Agent, AgentRegistry, AgentSpec, ContractSchema, RegistryBuilder, ToolBinding};
pub use resilience::{coerce, Coerced, CoercionPath, RawOutput, StageOutput, StageRecord};
pub use sla::SlaStatus;
