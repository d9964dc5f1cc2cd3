//! Reasoning engines.
//!
//! An engine receives a registered agent and its JSON input and returns raw,
//! untrusted output. The orchestrator coerces that output into the agent's
//! contract; engines never validate.
//!
//! - [`RuleEngine`]: deterministic, in-process.
//! - [`HttpEngine`]: OpenAI-compatible chat-completions endpoint.

pub mod http;
pub mod rules;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use coordination::{Agent, RawOutput};
use serde_json::Value;

pub use http::HttpEngine;
pub use rules::RuleEngine;

use crate::agents::knowledge::KnowledgeBase;
use crate::config::{EngineKind, SupportConfig};

/// Produces raw output for an agent invocation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &'static str;

    async fn invoke(&self, agent: &Agent, input: &Value) -> Result<RawOutput>;
}

/// Build the engine selected in `config`.
pub fn build_engine(
    config: &SupportConfig,
    knowledge: Arc<dyn KnowledgeBase>,
) -> Result<Arc<dyn ReasoningEngine>> {
    let engine: Arc<dyn ReasoningEngine> = match config.engine {
        EngineKind::Rules => Arc::new(RuleEngine::new(knowledge)),
        EngineKind::Http => Arc::new(HttpEngine::from_config(config)?),
    };
    tracing::info!(engine = engine.name(), "Reasoning engine ready");
    Ok(engine)
}
