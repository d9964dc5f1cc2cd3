//! Performance monitoring records.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{json_type, schema_via_wire, Contract};
use crate::error::{SupportError, SupportResult};
use crate::sla;

/// A named metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PerformanceMetric {
    pub metric_name: String,
    pub value: f64,
}

impl PerformanceMetric {
    pub fn new(metric_name: impl Into<String>, value: f64) -> Self {
        Self {
            metric_name: metric_name.into(),
            value,
        }
    }
}

impl Contract for PerformanceMetric {
    const NAME: &'static str = "PerformanceMetric";
    const FIELDS: &'static [&'static str] = &["metric_name", "value"];
}

/// One ticket status update or log entry: an opaque key/value record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TicketUpdate(Map<String, Value>);

impl TicketUpdate {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for TicketUpdate {
    type Error = SupportError;

    fn try_from(value: Value) -> SupportResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SupportError::schema(
                "ticket_updates",
                format!("expected an object, got {}", json_type(&other)),
            )),
        }
    }
}

/// SLA targets: metric name to minimum acceptable value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>")]
pub struct SlaTargets(BTreeMap<String, f64>);

schema_via_wire!(SlaTargets, BTreeMap<String, f64>, "SlaTargets");

impl TryFrom<BTreeMap<String, f64>> for SlaTargets {
    type Error = SupportError;

    fn try_from(targets: BTreeMap<String, f64>) -> SupportResult<Self> {
        Self::new(targets)
    }
}

impl SlaTargets {
    pub fn new(targets: BTreeMap<String, f64>) -> SupportResult<Self> {
        for (name, target) in &targets {
            if name.trim().is_empty() {
                return Err(SupportError::schema("sla_targets", "metric name must not be empty"));
            }
            if !target.is_finite() {
                return Err(SupportError::schema(
                    "sla_targets",
                    format!("target for `{name}` must be a finite number"),
                ));
            }
        }
        Ok(Self(targets))
    }

    /// Minimum acceptable value for `metric`, if it has a target.
    pub fn target(&self, metric: &str) -> Option<f64> {
        self.0.get(metric).copied()
    }

    /// These targets with `other` taking precedence on shared names.
    pub fn overlay(&self, other: &SlaTargets) -> SlaTargets {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(name, target)| (name.clone(), *target)));
        Self(merged)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, target)| (name.as_str(), *target))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Input to the monitoring stage.
///
/// Validation is all-or-nothing: one malformed update rejects the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MonitoringRequestWire")]
pub struct MonitoringRequest {
    ticket_updates: Vec<TicketUpdate>,
    sla_targets: SlaTargets,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct MonitoringRequestWire {
    /// List of ticket status updates and logs.
    ticket_updates: Vec<Value>,
    /// SLA targets for metrics like response time, resolution time.
    sla_targets: SlaTargets,
}

schema_via_wire!(MonitoringRequest, MonitoringRequestWire, "MonitoringRequest");

impl TryFrom<MonitoringRequestWire> for MonitoringRequest {
    type Error = SupportError;

    fn try_from(wire: MonitoringRequestWire) -> SupportResult<Self> {
        let mut updates = Vec::with_capacity(wire.ticket_updates.len());
        for (idx, value) in wire.ticket_updates.into_iter().enumerate() {
            let update = TicketUpdate::try_from(value).map_err(|e| match e {
                SupportError::SchemaViolation { constraint, .. } => {
                    SupportError::schema(format!("ticket_updates[{idx}]"), constraint)
                }
                other => other,
            })?;
            updates.push(update);
        }
        Ok(Self::new(updates, wire.sla_targets))
    }
}

impl MonitoringRequest {
    pub fn new(ticket_updates: Vec<TicketUpdate>, sla_targets: SlaTargets) -> Self {
        Self {
            ticket_updates,
            sla_targets,
        }
    }

    pub fn ticket_updates(&self) -> &[TicketUpdate] {
        &self.ticket_updates
    }

    pub fn sla_targets(&self) -> &SlaTargets {
        &self.sla_targets
    }
}

impl Contract for MonitoringRequest {
    const NAME: &'static str = "MonitoringRequest";
    const FIELDS: &'static [&'static str] = &["ticket_updates", "sla_targets"];
}

/// Result of a monitoring run.
///
/// `alerts_sent` is true exactly when `sla_breaches` is non-empty, and every
/// breach names one of the reported metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PerformanceReportWire")]
pub struct PerformanceReport {
    metrics: Vec<PerformanceMetric>,
    sla_breaches: BTreeSet<String>,
    alerts_sent: bool,
    dashboard_report: String,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct PerformanceReportWire {
    metrics: Vec<PerformanceMetric>,
    /// List of SLA metrics that are below threshold.
    sla_breaches: Vec<String>,
    /// Whether alerts were sent to managers.
    alerts_sent: bool,
    /// Formatted summary for dashboard display.
    dashboard_report: String,
}

schema_via_wire!(PerformanceReport, PerformanceReportWire, "PerformanceReport");

impl TryFrom<PerformanceReportWire> for PerformanceReport {
    type Error = SupportError;

    fn try_from(wire: PerformanceReportWire) -> SupportResult<Self> {
        let sla_breaches: BTreeSet<String> = wire.sla_breaches.into_iter().collect();

        if let Some(metric) = wire.metrics.iter().find(|m| !m.value.is_finite()) {
            return Err(SupportError::schema(
                "metrics",
                format!("value of `{}` must be a finite number", metric.metric_name),
            ));
        }

        if wire.alerts_sent != !sla_breaches.is_empty() {
            return Err(SupportError::schema(
                "alerts_sent",
                "must be true exactly when sla_breaches is non-empty",
            ));
        }
        if let Some(stray) = sla_breaches
            .iter()
            .find(|name| !wire.metrics.iter().any(|m| &m.metric_name == *name))
        {
            return Err(SupportError::schema(
                "sla_breaches",
                format!("`{stray}` is not a reported metric"),
            ));
        }

        Ok(Self {
            metrics: wire.metrics,
            sla_breaches,
            alerts_sent: wire.alerts_sent,
            dashboard_report: wire.dashboard_report,
        })
    }
}

impl PerformanceReport {
    /// Compute breaches, alert state and the dashboard text from metrics and
    /// targets. Same inputs always produce the same report.
    ///
    /// Non-finite metric values cannot be represented in JSON and are dropped.
    pub fn evaluate(metrics: Vec<PerformanceMetric>, targets: &SlaTargets) -> Self {
        let (metrics, dropped): (Vec<_>, Vec<_>) =
            metrics.into_iter().partition(|m| m.value.is_finite());
        for metric in &dropped {
            tracing::warn!(metric = %metric.metric_name, value = metric.value, "Dropping non-finite metric");
        }
        let sla_breaches = sla::find_breaches(&metrics, targets);
        let dashboard_report = sla::render_dashboard(&metrics, &sla_breaches, targets);
        Self {
            alerts_sent: !sla_breaches.is_empty(),
            metrics,
            sla_breaches,
            dashboard_report,
        }
    }

    /// Report with no metrics, used when monitoring output is unusable.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            metrics: Vec::new(),
            sla_breaches: BTreeSet::new(),
            alerts_sent: false,
            dashboard_report: format!("Performance data unavailable: {reason}"),
        }
    }

    pub fn metrics(&self) -> &[PerformanceMetric] {
        &self.metrics
    }

    pub fn sla_breaches(&self) -> &BTreeSet<String> {
        &self.sla_breaches
    }

    pub fn alerts_sent(&self) -> bool {
        self.alerts_sent
    }

    pub fn dashboard_report(&self) -> &str {
        &self.dashboard_report
    }

    /// Give up the metrics, e.g. to re-evaluate them against other targets.
    pub fn into_metrics(self) -> Vec<PerformanceMetric> {
        self.metrics
    }
}

impl Contract for PerformanceReport {
    const NAME: &'static str = "PerformanceReport";
    const FIELDS: &'static [&'static str] =
        &["metrics", "sla_breaches", "alerts_sent", "dashboard_report"];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::parse_contract;
    use serde_json::json;

    fn targets(pairs: &[(&str, f64)]) -> SlaTargets {
        SlaTargets::new(
            pairs
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_monitoring_request_rejects_non_object_update() {
        let err = parse_contract::<MonitoringRequest>(json!({
            "ticket_updates": [{"ticket_id": "T1"}, 42],
            "sla_targets": {"sla_compliance": 0.9}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            SupportError::schema("ticket_updates[1]", "expected an object, got number")
        );
    }

    #[test]
    fn test_monitoring_request_rejects_non_numeric_target() {
        let err = parse_contract::<MonitoringRequest>(json!({
            "ticket_updates": [],
            "sla_targets": {"sla_compliance": "high"}
        }))
        .unwrap_err();
        assert!(matches!(err, SupportError::SchemaViolation { .. }));
    }

    #[test]
    fn test_monitoring_request_accepts_opaque_updates() {
        let request: MonitoringRequest = parse_contract(json!({
            "ticket_updates": [{"ticket_id": "T1", "anything": [1, 2, 3]}],
            "sla_targets": {}
        }))
        .unwrap();
        assert_eq!(request.ticket_updates().len(), 1);
        assert_eq!(request.ticket_updates()[0].get("ticket_id"), Some(&json!("T1")));
        assert!(request.sla_targets().is_empty());
    }

    #[test]
    fn test_overlay_prefers_other() {
        let base = targets(&[("sla_compliance", 0.95), ("customer_satisfaction", 4.0)]);
        let merged = base.overlay(&targets(&[("sla_compliance", 0.8)]));
        assert_eq!(merged.target("sla_compliance"), Some(0.8));
        assert_eq!(merged.target("customer_satisfaction"), Some(4.0));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_sla_targets_reject_non_finite() {
        let mut map = BTreeMap::new();
        map.insert("sla_compliance".to_string(), f64::NAN);
        assert!(SlaTargets::new(map).is_err());
    }

    #[test]
    fn test_evaluate_sets_alerts_from_breaches() {
        let report = PerformanceReport::evaluate(
            vec![
                PerformanceMetric::new("sla_compliance", 0.6),
                PerformanceMetric::new("customer_satisfaction", 95.0),
            ],
            &targets(&[("sla_compliance", 0.9), ("customer_satisfaction", 90.0)]),
        );
        assert!(report.alerts_sent());
        assert_eq!(
            report.sla_breaches().iter().collect::<Vec<_>>(),
            vec!["sla_compliance"]
        );

        let clean = PerformanceReport::evaluate(
            vec![PerformanceMetric::new("sla_compliance", 0.95)],
            &targets(&[("sla_compliance", 0.9)]),
        );
        assert!(!clean.alerts_sent());
        assert!(clean.sla_breaches().is_empty());
    }

    #[test]
    fn test_wire_rejects_inconsistent_alert_flag() {
        let err = parse_contract::<PerformanceReport>(json!({
            "metrics": [{"metric_name": "sla_compliance", "value": 0.6}],
            "sla_breaches": ["sla_compliance"],
            "alerts_sent": false,
            "dashboard_report": "x"
        }))
        .unwrap_err();
        match err {
            SupportError::SchemaViolation { field, .. } => assert_eq!(field, "alerts_sent"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wire_rejects_breach_for_unreported_metric() {
        let err = parse_contract::<PerformanceReport>(json!({
            "metrics": [],
            "sla_breaches": ["unknown"],
            "alerts_sent": true,
            "dashboard_report": "x"
        }))
        .unwrap_err();
        match err {
            SupportError::SchemaViolation { field, .. } => assert_eq!(field, "sla_breaches"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unavailable_report_is_consistent() {
        let report = PerformanceReport::unavailable("parse error");
        assert!(report.metrics().is_empty());
        assert!(!report.alerts_sent());
        assert!(report.dashboard_report().contains("parse error"));
    }

    #[test]
    fn test_metric_rejects_extra_field() {
        let err = parse_contract::<PerformanceMetric>(json!({
            "metric_name": "x",
            "value": 1.0,
            "unit": "s"
        }))
        .unwrap_err();
        assert_eq!(
            err,
            SupportError::schema("unit", "unrecognized field for PerformanceMetric")
        );
    }

    #[test]
    fn test_evaluate_drops_non_finite_metrics() {
        let report = PerformanceReport::evaluate(
            vec![
                PerformanceMetric::new("avg_resolution_time", f64::INFINITY),
                PerformanceMetric::new("customer_satisfaction", f64::NAN),
                PerformanceMetric::new("sla_compliance", 0.6),
            ],
            &targets(&[("avg_resolution_time", 1.0), ("sla_compliance", 0.9)]),
        );
        assert_eq!(report.metrics(), &[PerformanceMetric::new("sla_compliance", 0.6)]);
        assert!(!report.sla_breaches().contains("avg_resolution_time"));
        assert!(!report.dashboard_report().contains("inf"));

        // What the report emits must parse back as the same contract.
        let json = serde_json::to_value(&report).unwrap();
        let reparsed: PerformanceReport = parse_contract(json).unwrap();
        assert_eq!(reparsed, report);
    }
}
