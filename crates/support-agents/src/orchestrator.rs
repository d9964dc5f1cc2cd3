//! Stage pipeline.
//!
//! ```text
//! TriageRequest ─► triage_agent ─► coerce ─► TriageResult
//!                                               │
//!                         knowledge lookup ◄────┘
//!                                │
//!        ResolutionInput ─► resolution_agent ─► coerce ─► disposition gate ─► ResolutionResult
//!
//! MonitoringRequest (+ default targets) ─► performance_monitoring_agent ─► coerce ─► re-evaluate
//! ```
//!
//! The `run_*` methods return [`SupportError`]s. The `handle_*` methods are
//! the JSON boundary: they parse closed-world input, run, audit, and report
//! failures as [`RequestFailure`]s.

use std::sync::Arc;

use anyhow::Result;
use coordination::{
    coerce, json_type, parse_contract, Agent, AgentRegistry, CoercionPath, Coerced,
    MonitoringRequest, PerformanceReport, RawOutput, RequestFailure, ResolutionInput,
    ResolutionRequest, ResolutionResult, SlaTargets, Stage, StageOutput, SupportError, SupportResult,
    TriageRequest, TriageResult,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::agents::knowledge::{is_hit, KnowledgeBase, StaticKnowledgeBase};
use crate::agents::resolution::enforce_disposition;
use crate::agents::{PERFORMANCE_MONITORING_AGENT, RESOLUTION_AGENT, TRIAGE_AGENT};
use crate::config::{SupportConfig, DEFAULT_ESCALATION_CHANNEL};
use crate::engine::{build_engine, ReasoningEngine};
use crate::telemetry::{AuditLog, AuditOutcome, AuditRecord, StageTrace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResponse {
    pub triage_result: TriageResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResponse {
    pub resolution_result: ResolutionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringResponse {
    pub monitoring_result: PerformanceReport,
}

/// Output of [`Orchestrator::run_agent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunResponse {
    pub agent_name: String,
    pub input_query: Value,
    pub output: Value,
}

/// One inquiry taken through triage and resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub triage: TriageResult,
    pub resolution: ResolutionResult,
    /// Whether the knowledge lookup found an article.
    pub knowledge_hit: bool,
    pub stages: Vec<StageTrace>,
}

/// Per-item result of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItem {
    Ok { outcome: PipelineOutcome },
    Failed { failure: RequestFailure },
}

impl From<Result<PipelineOutcome, RequestFailure>> for BatchItem {
    fn from(result: Result<PipelineOutcome, RequestFailure>) -> Self {
        match result {
            Ok(outcome) => Self::Ok { outcome },
            Err(failure) => Self::Failed { failure },
        }
    }
}

pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    engine: Arc<dyn ReasoningEngine>,
    knowledge: Arc<dyn KnowledgeBase>,
    escalation_channel: String,
    default_targets: SlaTargets,
    audit: Option<AuditLog>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        engine: Arc<dyn ReasoningEngine>,
        knowledge: Arc<dyn KnowledgeBase>,
    ) -> Self {
        Self {
            registry,
            engine,
            knowledge,
            escalation_channel: DEFAULT_ESCALATION_CHANNEL.to_string(),
            default_targets: SlaTargets::default(),
            audit: None,
        }
    }

    /// Wire up the knowledge base, engine, channel, targets and audit log
    /// described by `config`.
    pub fn from_config(config: &SupportConfig, registry: Arc<AgentRegistry>) -> Result<Self> {
        let knowledge: Arc<dyn KnowledgeBase> =
            Arc::new(StaticKnowledgeBase::new(config.articles.clone())?);
        let engine = build_engine(config, knowledge.clone())?;
        let mut orchestrator = Self::new(registry, engine, knowledge)
            .with_escalation_channel(&config.escalation_channel)
            .with_default_targets(config.default_targets()?);
        if let Some(path) = &config.audit_log {
            orchestrator = orchestrator.with_audit(AuditLog::new(path));
        }
        Ok(orchestrator)
    }

    pub fn with_escalation_channel(mut self, channel: &str) -> Self {
        self.escalation_channel = channel.to_string();
        self
    }

    /// Targets applied to every monitoring batch under the request's own.
    pub fn with_default_targets(mut self, targets: SlaTargets) -> Self {
        self.default_targets = targets;
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn audit_log(&self) -> Option<&AuditLog> {
        self.audit.as_ref()
    }

    // ── stages ──────────────────────────────────────────────────────────

    async fn invoke(&self, agent_name: &str, input: &Value) -> SupportResult<(Arc<Agent>, RawOutput)> {
        let agent = self.registry.resolve(agent_name)?;
        let raw = self
            .engine
            .invoke(&agent, input)
            .await
            .map_err(|e| SupportError::collaborator(self.engine.name(), e))?;
        Ok((agent, raw))
    }

    async fn triage_stage(&self, request: &TriageRequest) -> SupportResult<(TriageResult, StageTrace)> {
        let input = to_input(request)?;
        let (agent, raw) = self.invoke(TRIAGE_AGENT, &input).await?;
        let coerced = coerce::<TriageResult>(raw, request.metadata());
        let trace = stage_trace(&agent, &coerced);
        // Metadata always echoes the request, whatever the engine returned.
        let result = coerced.value.with_metadata(request.metadata().clone());
        info!(
            stage = %Stage::Triage,
            category = %result.category(),
            priority = %result.priority(),
            confidence = result.confidence(),
            clarification_needed = result.clarification_needed(),
            "Triage complete"
        );
        Ok((result, trace))
    }

    async fn resolution_stage(
        &self,
        request: &ResolutionRequest,
    ) -> SupportResult<(ResolutionResult, bool, StageTrace)> {
        let evidence = self
            .knowledge
            .lookup(request.inquiry_text())
            .await
            .map_err(|e| SupportError::collaborator("knowledge base", e))?;
        let hit = is_hit(&evidence);
        info!(stage = %Stage::Resolution, hit, "Knowledge lookup complete");

        let input = to_input(&ResolutionInput::new(
            request,
            evidence.clone(),
            self.escalation_channel.as_str(),
        ))?;
        let (agent, raw) = self.invoke(RESOLUTION_AGENT, &input).await?;
        let coerced = coerce::<ResolutionResult>(raw, self.escalation_channel.as_str());
        let trace = stage_trace(&agent, &coerced);
        let result = enforce_disposition(coerced.value, &evidence, &self.escalation_channel)?;
        info!(
            stage = %Stage::Resolution,
            status = %result.ticket_status(),
            channel = result.escalation_channel().unwrap_or("-"),
            "Resolution complete"
        );
        Ok((result, hit, trace))
    }

    async fn monitoring_stage(
        &self,
        request: &MonitoringRequest,
    ) -> SupportResult<(PerformanceReport, StageTrace)> {
        let targets = self.default_targets.overlay(request.sla_targets());
        let effective = MonitoringRequest::new(request.ticket_updates().to_vec(), targets.clone());
        let input = to_input(&effective)?;
        let (agent, raw) = self.invoke(PERFORMANCE_MONITORING_AGENT, &input).await?;
        let coerced = coerce::<PerformanceReport>(raw, &targets);
        let trace = stage_trace(&agent, &coerced);
        let report = match coerced.path {
            CoercionPath::Defaulted => coerced.value,
            _ => PerformanceReport::evaluate(coerced.value.into_metrics(), &targets),
        };
        info!(
            stage = %Stage::Monitoring,
            metrics = report.metrics().len(),
            breaches = report.sla_breaches().len(),
            alerts_sent = report.alerts_sent(),
            "Monitoring complete"
        );
        Ok((report, trace))
    }

    /// Classify an inquiry.
    pub async fn run_triage(&self, request: &TriageRequest) -> SupportResult<TriageResult> {
        Ok(self.triage_stage(request).await?.0)
    }

    /// Look up the knowledge base and draft a reply. A lookup miss always
    /// ends escalated.
    pub async fn run_resolution(&self, request: &ResolutionRequest) -> SupportResult<ResolutionResult> {
        Ok(self.resolution_stage(request).await?.0)
    }

    /// Compute metrics and SLA breaches for a batch of ticket updates.
    pub async fn run_monitoring(&self, request: &MonitoringRequest) -> SupportResult<PerformanceReport> {
        Ok(self.monitoring_stage(request).await?.0)
    }

    /// Triage then resolve one inquiry, strictly in order.
    pub async fn run_pipeline(&self, request: &TriageRequest) -> SupportResult<PipelineOutcome> {
        let run_id = Uuid::new_v4();
        async {
            let (triage, triage_trace) = self.triage_stage(request).await?;
            let resolution_request = ResolutionRequest::new(triage.clone(), request.inquiry_text())?;
            let (resolution, knowledge_hit, resolution_trace) =
                self.resolution_stage(&resolution_request).await?;
            Ok::<_, SupportError>(PipelineOutcome {
                run_id,
                triage,
                resolution,
                knowledge_hit,
                stages: vec![triage_trace, resolution_trace],
            })
        }
        .instrument(info_span!("pipeline", run_id = %run_id))
        .await
    }

    /// Run independent pipelines concurrently. Results keep input order.
    pub async fn run_batch(&self, requests: &[TriageRequest]) -> Vec<SupportResult<PipelineOutcome>> {
        join_all(requests.iter().map(|request| self.run_pipeline(request))).await
    }

    /// Run any registered agent directly and return its raw output.
    pub async fn run_agent(&self, name: &str, query: Value) -> SupportResult<AgentRunResponse> {
        let (agent, raw) = self.invoke(name, &query).await?;
        info!(agent = %agent.name(), "Agent run complete");
        Ok(AgentRunResponse {
            agent_name: agent.name().to_string(),
            input_query: query,
            output: raw.into_value(),
        })
    }

    // ── JSON boundary ───────────────────────────────────────────────────

    pub async fn handle_triage(&self, input: Value) -> Result<TriageResponse, RequestFailure> {
        let result = async {
            let request: TriageRequest = parse_contract(input)?;
            let (triage_result, trace) = self.triage_stage(&request).await?;
            Ok::<_, SupportError>((TriageResponse { triage_result }, vec![trace]))
        }
        .await;
        self.finish(Uuid::new_v4(), "triage", result)
    }

    pub async fn handle_resolution(&self, input: Value) -> Result<ResolutionResponse, RequestFailure> {
        let result = async {
            let request: ResolutionRequest = parse_contract(input)?;
            let (resolution_result, _, trace) = self.resolution_stage(&request).await?;
            Ok::<_, SupportError>((ResolutionResponse { resolution_result }, vec![trace]))
        }
        .await;
        self.finish(Uuid::new_v4(), "resolution", result)
    }

    pub async fn handle_monitoring(&self, input: Value) -> Result<MonitoringResponse, RequestFailure> {
        let result = async {
            let request: MonitoringRequest = parse_contract(input)?;
            let (monitoring_result, trace) = self.monitoring_stage(&request).await?;
            Ok::<_, SupportError>((MonitoringResponse { monitoring_result }, vec![trace]))
        }
        .await;
        self.finish(Uuid::new_v4(), "monitoring", result)
    }

    pub async fn handle_pipeline(&self, input: Value) -> Result<PipelineOutcome, RequestFailure> {
        let result = async {
            let request: TriageRequest = parse_contract(input)?;
            let outcome = self.run_pipeline(&request).await?;
            let stages = outcome.stages.clone();
            Ok::<_, SupportError>((outcome, stages))
        }
        .await;
        let run_id = match &result {
            Ok((outcome, _)) => outcome.run_id,
            Err(_) => Uuid::new_v4(),
        };
        self.finish(run_id, "pipeline", result)
    }

    /// Run every element of a JSON array through the pipeline. One bad
    /// element fails only its own slot.
    pub async fn handle_batch(&self, input: Value) -> Result<Vec<BatchItem>, RequestFailure> {
        let items = match input {
            Value::Array(items) => items,
            other => {
                let err = SupportError::schema(
                    "batch",
                    format!("expected an array of TriageRequest, got {}", json_type(&other)),
                );
                warn!(code = err.code(), "Request rejected: {err}");
                return Err(err.into());
            }
        };
        let results = join_all(items.into_iter().map(|item| self.handle_pipeline(item))).await;
        Ok(results.into_iter().map(BatchItem::from).collect())
    }

    pub async fn handle_agent(&self, name: &str, query: Value) -> Result<AgentRunResponse, RequestFailure> {
        let result = self.run_agent(name, query).await.map(|response| (response, Vec::new()));
        self.finish(Uuid::new_v4(), "agent", result)
    }

    /// Log and audit the outcome of a boundary call.
    fn finish<T: Serialize>(
        &self,
        run_id: Uuid,
        operation: &str,
        result: SupportResult<(T, Vec<StageTrace>)>,
    ) -> Result<T, RequestFailure> {
        match result {
            Ok((response, stages)) => {
                if let Some(audit) = &self.audit {
                    let output = serde_json::to_value(&response).unwrap_or(Value::Null);
                    audit.append(&AuditRecord::new(run_id, operation, stages, AuditOutcome::Ok { output }));
                }
                Ok(response)
            }
            Err(err) => {
                warn!(%run_id, operation, code = err.code(), kind = %err.kind(), "Request failed: {err}");
                let failure = RequestFailure::from(err);
                if let Some(audit) = &self.audit {
                    audit.append(&AuditRecord::new(
                        run_id,
                        operation,
                        Vec::new(),
                        AuditOutcome::Failed {
                            failure: failure.clone(),
                        },
                    ));
                }
                Err(failure)
            }
        }
    }
}

fn to_input<T: Serialize>(value: &T) -> SupportResult<Value> {
    serde_json::to_value(value).map_err(|e| SupportError::schema("input", e.to_string()))
}

fn stage_trace<T: StageOutput>(agent: &Agent, coerced: &Coerced<T>) -> StageTrace {
    StageTrace {
        stage: T::STAGE,
        agent: agent.name().to_string(),
        path: coerced.path,
        issues: coerced.issues.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::default_registry;
    use crate::agents::knowledge::{MockKnowledgeBase, NO_ARTICLE_FOUND};
    use crate::engine::{MockReasoningEngine, RuleEngine};
    use coordination::{
        Category, Channel, FailureKind, InquiryMetadata, KnowledgeLookupResult, MetricSource,
        PerformanceMetric, Priority, StageRecord, TicketStatus, TicketUpdate,
    };
    use serde_json::json;

    fn meta() -> InquiryMetadata {
        InquiryMetadata::new(Channel::Email, "C1", None).unwrap()
    }

    fn triage_request(text: &str) -> TriageRequest {
        TriageRequest::new(text, meta()).unwrap()
    }

    fn kb_returning(text: &'static str) -> MockKnowledgeBase {
        let mut kb = MockKnowledgeBase::new();
        kb.expect_lookup().returning(move |_| {
            Ok(KnowledgeLookupResult {
                result: text.to_string(),
            })
        });
        kb
    }

    fn engine_returning(outputs: Vec<RawOutput>) -> MockReasoningEngine {
        let mut engine = MockReasoningEngine::new();
        engine.expect_name().return_const("mock");
        let mut outputs = outputs.into_iter();
        engine
            .expect_invoke()
            .returning(move |_, _| Ok(outputs.next().unwrap_or(RawOutput::Text(String::new()))));
        engine
    }

    fn orchestrator(engine: MockReasoningEngine, kb: MockKnowledgeBase) -> Orchestrator {
        Orchestrator::new(default_registry().unwrap(), Arc::new(engine), Arc::new(kb))
    }

    #[tokio::test]
    async fn test_triage_forces_request_metadata() {
        let other = InquiryMetadata::new(Channel::Phone, "C999", None).unwrap();
        let typed = TriageResult::new(Category::Billing, Priority::High, 0.9, other).unwrap();
        let orch = orchestrator(
            engine_returning(vec![RawOutput::Record(StageRecord::Triage(typed))]),
            MockKnowledgeBase::new(),
        );

        let result = orch.run_triage(&triage_request("refund please")).await.unwrap();
        assert_eq!(result.category(), Category::Billing);
        assert_eq!(result.ticket_metadata(), &meta());
    }

    #[tokio::test]
    async fn test_triage_garbage_defaults() {
        let orch = orchestrator(
            engine_returning(vec![RawOutput::Text("I am not JSON".into())]),
            MockKnowledgeBase::new(),
        );
        let (result, trace) = orch.triage_stage(&triage_request("hello")).await.unwrap();
        assert_eq!(trace.path, CoercionPath::Defaulted);
        assert_eq!(result.category(), Category::General);
        assert!(result.clarification_needed());
    }

    #[tokio::test]
    async fn test_engine_failure_is_upstream() {
        let mut engine = MockReasoningEngine::new();
        engine.expect_name().return_const("mock");
        engine
            .expect_invoke()
            .returning(|_, _| Err(anyhow::anyhow!("connection refused")));
        let orch = orchestrator(engine, MockKnowledgeBase::new());

        let failure = orch
            .handle_triage(json!({
                "inquiry_text": "hi",
                "metadata": {"channel": "chat", "customer_id": "C2", "customer_history": null}
            }))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Upstream);
        assert!(failure.message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_lookup_miss_overrides_resolved_claim() {
        let claimed = ResolutionResult::resolved("All fixed!", None).unwrap();
        let orch = orchestrator(
            engine_returning(vec![RawOutput::Record(StageRecord::Resolution(claimed))]),
            kb_returning(NO_ARTICLE_FOUND),
        );
        let ticket = TriageResult::new(Category::General, Priority::Low, 0.9, meta()).unwrap();
        let request = ResolutionRequest::new(ticket, "Where is my parcel?").unwrap();

        let result = orch.run_resolution(&request).await.unwrap();
        assert_eq!(result.ticket_status(), TicketStatus::Escalated);
        assert_eq!(result.escalation_channel(), Some(DEFAULT_ESCALATION_CHANNEL));
    }

    #[tokio::test]
    async fn test_blank_lookup_result_escalates() {
        let kb: Arc<dyn KnowledgeBase> = Arc::new(kb_returning(""));
        let engine = Arc::new(crate::engine::RuleEngine::new(kb.clone()));
        let orch = Orchestrator::new(default_registry().unwrap(), engine, kb);

        let outcome = orch
            .handle_pipeline(json!({
                "inquiry_text": "Do you sponsor chess tournaments?",
                "metadata": {"channel": "email", "customer_id": "C1", "customer_history": null}
            }))
            .await
            .unwrap();
        assert!(!outcome.knowledge_hit);
        assert_eq!(outcome.resolution.ticket_status(), TicketStatus::Escalated);
        assert_eq!(
            outcome.resolution.escalation_channel(),
            Some(DEFAULT_ESCALATION_CHANNEL)
        );
    }

    #[tokio::test]
    async fn test_blank_lookup_overrides_engine_resolved_claim() {
        let claimed = ResolutionResult::resolved("Thanks for reaching out. ", None).unwrap();
        let orch = orchestrator(
            engine_returning(vec![RawOutput::Record(StageRecord::Resolution(claimed))]),
            kb_returning("   "),
        );
        let ticket = TriageResult::new(Category::General, Priority::Low, 0.9, meta()).unwrap();
        let request = ResolutionRequest::new(ticket, "Do you sponsor chess tournaments?").unwrap();

        let (result, hit, _) = orch.resolution_stage(&request).await.unwrap();
        assert!(!hit);
        assert_eq!(result.ticket_status(), TicketStatus::Escalated);
    }

    #[tokio::test]
    async fn test_lookup_happens_before_engine() {
        let mut kb = MockKnowledgeBase::new();
        kb.expect_lookup()
            .withf(|query| query == "reset my password")
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("kb offline")));
        let mut engine = MockReasoningEngine::new();
        engine.expect_name().return_const("mock");
        engine.expect_invoke().never();
        let orch = orchestrator(engine, kb);
        let ticket = TriageResult::new(Category::Technical, Priority::Low, 0.9, meta()).unwrap();
        let request = ResolutionRequest::new(ticket, "reset my password").unwrap();

        let err = orch.run_resolution(&request).await.unwrap_err();
        assert_eq!(err.code(), "COLLABORATOR_FAILURE");
    }

    #[tokio::test]
    async fn test_resolution_input_carries_evidence() {
        let mut engine = MockReasoningEngine::new();
        engine.expect_name().return_const("mock");
        engine
            .expect_invoke()
            .withf(|agent, input| {
                agent.name() == RESOLUTION_AGENT
                    && agent.input_contract().map(|c| c.name.as_str()) == Some("ResolutionInput")
                    && parse_contract::<ResolutionInput>(input.clone()).is_ok()
                    && input["knowledge_lookup"]["result"] == "Use the Forgot Password link."
                    && input["escalation_channel"] == "email:tier2@example.com"
            })
            .returning(|_, _| {
                Ok(RawOutput::Text(
                    r#"{"resolution_reply": "Use the link.", "ticket_status": "resolved", "resolution_notes": null, "escalation_channel": null}"#.into(),
                ))
            });
        let orch = orchestrator(engine, kb_returning("Use the Forgot Password link."))
            .with_escalation_channel("email:tier2@example.com");
        let ticket = TriageResult::new(Category::Technical, Priority::Low, 0.9, meta()).unwrap();
        let request = ResolutionRequest::new(ticket, "forgot password").unwrap();

        let (result, hit, trace) = orch.resolution_stage(&request).await.unwrap();
        assert!(hit);
        assert_eq!(trace.path, CoercionPath::Parsed);
        assert_eq!(result.ticket_status(), TicketStatus::Resolved);
    }

    #[tokio::test]
    async fn test_monitoring_recomputes_breaches() {
        // Engine claims no breach; targets say otherwise.
        let orch = orchestrator(
            engine_returning(vec![RawOutput::Text(
                r#"{"metrics": [{"metric_name": "sla_compliance", "value": 0.6}], "sla_breaches": [], "alerts_sent": false, "dashboard_report": "all good"}"#.into(),
            )]),
            MockKnowledgeBase::new(),
        );
        let request: MonitoringRequest = parse_contract(json!({
            "ticket_updates": [],
            "sla_targets": {"sla_compliance": 0.9}
        }))
        .unwrap();

        let report = orch.run_monitoring(&request).await.unwrap();
        assert!(report.alerts_sent());
        assert!(report.sla_breaches().contains("sla_compliance"));
    }

    #[tokio::test]
    async fn test_monitoring_merges_default_targets() {
        let mut engine = MockReasoningEngine::new();
        engine.expect_name().return_const("mock");
        engine
            .expect_invoke()
            .withf(|_, input| {
                input["sla_targets"]["customer_satisfaction"] == 4.0
                    && input["sla_targets"]["sla_compliance"] == 0.5
            })
            .returning(|_, _| Ok(RawOutput::Mapping(serde_json::Map::new())));
        let defaults: SlaTargets =
            serde_json::from_value(json!({"customer_satisfaction": 4.0, "sla_compliance": 0.95}))
                .unwrap();
        let orch = orchestrator(engine, MockKnowledgeBase::new()).with_default_targets(defaults);
        let request: MonitoringRequest = parse_contract(json!({
            "ticket_updates": [],
            "sla_targets": {"sla_compliance": 0.5}
        }))
        .unwrap();

        let (report, trace) = orch.monitoring_stage(&request).await.unwrap();
        assert_eq!(trace.path, CoercionPath::Defaulted);
        assert!(!report.alerts_sent());
    }

    struct FixedSource(f64);

    impl MetricSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn compute(&self, _updates: &[TicketUpdate]) -> Vec<PerformanceMetric> {
            vec![PerformanceMetric::new("sla_compliance", self.0)]
        }
    }

    fn rules_orchestrator(engine: RuleEngine) -> Orchestrator {
        Orchestrator::new(
            default_registry().unwrap(),
            Arc::new(engine),
            Arc::new(MockKnowledgeBase::new()),
        )
    }

    #[tokio::test]
    async fn test_swapped_metric_source_drives_breaches() {
        let kb = Arc::new(StaticKnowledgeBase::with_defaults().unwrap());
        let engine = RuleEngine::new(kb).with_metric_source(Arc::new(FixedSource(0.6)));
        let orch = rules_orchestrator(engine);

        let response = orch
            .handle_monitoring(json!({
                "ticket_updates": [{"ticket_id": "T1", "sla_met": true}],
                "sla_targets": {"sla_compliance": 0.9}
            }))
            .await
            .unwrap();
        let report = response.monitoring_result;
        assert_eq!(report.metrics(), &[PerformanceMetric::new("sla_compliance", 0.6)]);
        assert!(report.sla_breaches().contains("sla_compliance"));
        assert!(report.alerts_sent());
    }

    #[tokio::test]
    async fn test_monitoring_huge_resolution_times_stay_finite() {
        let kb = Arc::new(StaticKnowledgeBase::with_defaults().unwrap());
        let orch = rules_orchestrator(RuleEngine::new(kb));

        let response = orch
            .handle_monitoring(json!({
                "ticket_updates": [
                    {"ticket_id": "T1", "resolution_time_hours": 1e308},
                    {"ticket_id": "T2", "resolution_time_hours": 1e308}
                ],
                "sla_targets": {}
            }))
            .await
            .unwrap();
        let report = response.monitoring_result;
        let avg = report
            .metrics()
            .iter()
            .find(|m| m.metric_name == "avg_resolution_time")
            .unwrap();
        assert_eq!(avg.value, 1e308);

        let wire = serde_json::to_value(&report).unwrap();
        assert_eq!(parse_contract::<PerformanceReport>(wire).unwrap(), report);
    }

    #[tokio::test]
    async fn test_unknown_agent_is_not_found() {
        let mut engine = MockReasoningEngine::new();
        engine.expect_invoke().never();
        let orch = orchestrator(engine, MockKnowledgeBase::new());

        let failure = orch.handle_agent("billing_agent", json!({})).await.unwrap_err();
        assert_eq!(failure.code, "UNKNOWN_AGENT");
        assert_eq!(failure.kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_batch_rejects_non_array() {
        let orch = orchestrator(MockReasoningEngine::new(), MockKnowledgeBase::new());
        let failure = orch.handle_batch(json!({"inquiry_text": "hi"})).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::InvalidInput);
    }
}
