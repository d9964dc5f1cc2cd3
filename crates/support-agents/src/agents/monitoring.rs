//! Performance monitoring over a metric source.

use coordination::{MetricSource, MonitoringRequest, PerformanceReport};

/// Compute metrics for the batch and evaluate them against the request's
/// SLA targets.
pub fn summarize(request: &MonitoringRequest, source: &dyn MetricSource) -> PerformanceReport {
    let metrics = source.compute(request.ticket_updates());
    let report = PerformanceReport::evaluate(metrics, request.sla_targets());
    tracing::debug!(
        source = source.name(),
        metrics = report.metrics().len(),
        breaches = report.sla_breaches().len(),
        "Monitoring batch summarized"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordination::{parse_contract, EventMetricSource, PerformanceMetric, TicketUpdate};
    use serde_json::json;

    struct FixedSource(Vec<PerformanceMetric>);

    impl MetricSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn compute(&self, _updates: &[TicketUpdate]) -> Vec<PerformanceMetric> {
            self.0.clone()
        }
    }

    #[test]
    fn test_compliance_below_target_breaches() {
        let request: MonitoringRequest = parse_contract(json!({
            "ticket_updates": [
                {"ticket_id": "T1", "sla_met": true},
                {"ticket_id": "T2", "sla_met": true},
                {"ticket_id": "T3", "sla_met": true},
                {"ticket_id": "T4", "sla_met": false},
                {"ticket_id": "T5", "sla_met": false}
            ],
            "sla_targets": {"sla_compliance": 0.9}
        }))
        .unwrap();

        let report = summarize(&request, &EventMetricSource);
        assert!(report.alerts_sent());
        assert!(report.sla_breaches().contains("sla_compliance"));
    }

    #[test]
    fn test_pluggable_source() {
        let request: MonitoringRequest = parse_contract(json!({
            "ticket_updates": [],
            "sla_targets": {"first_response": 2.0}
        }))
        .unwrap();
        let source = FixedSource(vec![
            PerformanceMetric::new("first_response", 3.0),
            PerformanceMetric::new("backlog", 0.0),
        ]);
        let report = summarize(&request, &source);
        assert_eq!(report.metrics().len(), 2);
        assert!(!report.alerts_sent());
    }
}
