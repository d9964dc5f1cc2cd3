//! Customer-support agent pipeline.
//!
//! Inquiries are triaged, resolved against the knowledge base (escalating on
//! a miss) and monitored against SLA targets. Contracts, coercion and SLA
//! evaluation live in the `coordination` crate; this crate supplies the
//! agents, reasoning engines, orchestration, configuration and audit log.

pub mod agents;
pub mod config;
pub mod engine;
pub mod orchestrator;
pub mod prompts;
pub mod telemetry;

pub use config::SupportConfig;
pub use orchestrator::{
    AgentRunResponse, BatchItem, MonitoringResponse, Orchestrator, PipelineOutcome,
    ResolutionResponse, TriageResponse,
};
