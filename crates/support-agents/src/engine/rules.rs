//! Deterministic in-process engine.
//!
//! Dispatches on the agent name and answers with fully typed records, so
//! every stage coerces on the `Typed` path.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use coordination::{
    parse_contract, Agent, EventMetricSource, MetricSource, MonitoringRequest, RawOutput,
    ResolutionInput, StageRecord, TriageRequest,
};
use serde_json::Value;

use super::ReasoningEngine;
use crate::agents::knowledge::KnowledgeBase;
use crate::agents::{
    monitoring, resolution, triage, KNOWLEDGE_BASE_AGENT, PERFORMANCE_MONITORING_AGENT,
    RESOLUTION_AGENT, TRIAGE_AGENT,
};

pub struct RuleEngine {
    knowledge: Arc<dyn KnowledgeBase>,
    metrics: Arc<dyn MetricSource>,
}

impl RuleEngine {
    pub fn new(knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            knowledge,
            metrics: Arc::new(EventMetricSource),
        }
    }

    /// Swap the metric source used by the monitoring agent.
    pub fn with_metric_source(mut self, metrics: Arc<dyn MetricSource>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Pull a search query out of a free-form tool input.
fn query_text(input: &Value) -> String {
    match input {
        Value::String(s) => s.clone(),
        Value::Object(map) => ["query", "inquiry_text"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| input.to_string()),
        other => other.to_string(),
    }
}

#[async_trait]
impl ReasoningEngine for RuleEngine {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn invoke(&self, agent: &Agent, input: &Value) -> Result<RawOutput> {
        let record = match agent.name() {
            TRIAGE_AGENT => {
                let request: TriageRequest = parse_contract(input.clone())?;
                StageRecord::Triage(triage::classify(&request))
            }
            RESOLUTION_AGENT => {
                let input: ResolutionInput = parse_contract(input.clone())?;
                StageRecord::Resolution(resolution::draft(
                    &input.ticket,
                    &input.knowledge_lookup,
                    &input.escalation_channel,
                )?)
            }
            KNOWLEDGE_BASE_AGENT => {
                let query = query_text(input);
                StageRecord::Knowledge(self.knowledge.lookup(&query).await?)
            }
            PERFORMANCE_MONITORING_AGENT => {
                let request: MonitoringRequest = parse_contract(input.clone())?;
                StageRecord::Monitoring(monitoring::summarize(&request, self.metrics.as_ref()))
            }
            other => bail!("rule engine has no rules for agent `{other}`"),
        };
        Ok(RawOutput::Record(record))
    }
}
