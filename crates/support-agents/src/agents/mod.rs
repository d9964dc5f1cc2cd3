//! Support agent definitions.
//!
//! Each agent is registered with its instructions and contracts. The
//! resolution agent reaches the knowledge base through the
//! `knowledge_base_tool_agent`, exposed to it as the `search_knowledge_base`
//! tool.

pub mod knowledge;
pub mod monitoring;
pub mod resolution;
pub mod triage;

use std::sync::Arc;

use coordination::{
    AgentRegistry, AgentSpec, KnowledgeLookupResult, MonitoringRequest, PerformanceReport,
    RegistryBuilder, ResolutionInput, ResolutionResult, SupportResult, TriageRequest,
    TriageResult,
};

use crate::prompts;

pub const TRIAGE_AGENT: &str = "triage_agent";
pub const RESOLUTION_AGENT: &str = "resolution_agent";
pub const KNOWLEDGE_BASE_AGENT: &str = "knowledge_base_tool_agent";
pub const PERFORMANCE_MONITORING_AGENT: &str = "performance_monitoring_agent";

/// Tool name the resolution agent calls the knowledge base by.
pub const SEARCH_KNOWLEDGE_BASE_TOOL: &str = "search_knowledge_base";

pub fn triage_spec() -> AgentSpec {
    AgentSpec::new(prompts::TRIAGE_INSTRUCTIONS)
        .input::<TriageRequest>()
        .output::<TriageResult>()
}

pub fn resolution_spec() -> AgentSpec {
    AgentSpec::new(prompts::RESOLUTION_INSTRUCTIONS)
        .input::<ResolutionInput>()
        .output::<ResolutionResult>()
        .tool(
            SEARCH_KNOWLEDGE_BASE_TOOL,
            prompts::SEARCH_KNOWLEDGE_BASE_DESCRIPTION,
            KNOWLEDGE_BASE_AGENT,
        )
        .require_tool()
}

pub fn knowledge_base_spec() -> AgentSpec {
    AgentSpec::new(prompts::KNOWLEDGE_BASE_INSTRUCTIONS)
        .output::<KnowledgeLookupResult>()
        .require_tool()
}

pub fn performance_monitoring_spec() -> AgentSpec {
    AgentSpec::new(prompts::PERFORMANCE_MONITORING_INSTRUCTIONS)
        .input::<MonitoringRequest>()
        .output::<PerformanceReport>()
}

/// Register the four standard agents.
pub fn register_defaults(builder: &mut RegistryBuilder) -> SupportResult<()> {
    builder
        .register(TRIAGE_AGENT, triage_spec())?
        .register(RESOLUTION_AGENT, resolution_spec())?
        .register(KNOWLEDGE_BASE_AGENT, knowledge_base_spec())?
        .register(PERFORMANCE_MONITORING_AGENT, performance_monitoring_spec())?;
    Ok(())
}

/// Build and validate the standard registry.
pub fn default_registry() -> SupportResult<Arc<AgentRegistry>> {
    let mut builder = RegistryBuilder::new();
    register_defaults(&mut builder)?;
    builder.build()
}
