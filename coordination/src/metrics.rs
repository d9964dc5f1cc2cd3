//! Metric sources for the monitoring stage.
//!
//! A [`MetricSource`] turns a batch of ticket updates into named metrics.
//! Sources are pure: the same batch always yields the same metrics in the
//! same order.

use crate::contracts::{PerformanceMetric, TicketUpdate};

pub const AVG_RESOLUTION_TIME: &str = "avg_resolution_time";
pub const CUSTOMER_SATISFACTION: &str = "customer_satisfaction";
pub const SLA_COMPLIANCE: &str = "sla_compliance";

/// Computes performance metrics from ticket updates.
pub trait MetricSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Derive metrics from an ordered batch of updates.
    fn compute(&self, updates: &[TicketUpdate]) -> Vec<PerformanceMetric>;
}

/// Default source: derives aggregate metrics from well-known update fields
/// and passes through explicit `{"metric_name", "value"}` events.
///
/// | Metric | Derived from |
/// |---|---|
/// | `avg_resolution_time` | mean of numeric `resolution_time_hours` |
/// | `customer_satisfaction` | mean of numeric `satisfaction` |
/// | `sla_compliance` | share of boolean `sla_met` fields that are true |
///
/// Explicit metric events are averaged per name and replace a derived
/// metric of the same name. Metrics with no contributing events are left
/// out entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventMetricSource;

/// Running mean. Updated incrementally so large values cannot overflow a
/// running sum; non-finite inputs are ignored.
#[derive(Default)]
struct Mean {
    mean: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0 && self.mean.is_finite()).then_some(self.mean)
    }
}

impl MetricSource for EventMetricSource {
    fn name(&self) -> &str {
        "event"
    }

    fn compute(&self, updates: &[TicketUpdate]) -> Vec<PerformanceMetric> {
        let mut resolution_time = Mean::default();
        let mut satisfaction = Mean::default();
        let mut compliance = Mean::default();
        let mut explicit: Vec<(String, Mean)> = Vec::new();

        for update in updates {
            if let Some(hours) = update.get("resolution_time_hours").and_then(|v| v.as_f64()) {
                resolution_time.push(hours);
            }
            if let Some(score) = update.get("satisfaction").and_then(|v| v.as_f64()) {
                satisfaction.push(score);
            }
            if let Some(met) = update.get("sla_met").and_then(|v| v.as_bool()) {
                compliance.push(if met { 1.0 } else { 0.0 });
            }

            let name = update.get("metric_name").and_then(|v| v.as_str());
            let value = update.get("value").and_then(|v| v.as_f64());
            if let (Some(name), Some(value)) = (name, value) {
                match explicit.iter_mut().find(|(n, _)| n == name) {
                    Some((_, mean)) => mean.push(value),
                    None => {
                        let mut mean = Mean::default();
                        mean.push(value);
                        explicit.push((name.to_string(), mean));
                    }
                }
            }
        }

        let mut metrics: Vec<PerformanceMetric> = [
            (AVG_RESOLUTION_TIME, &resolution_time),
            (CUSTOMER_SATISFACTION, &satisfaction),
            (SLA_COMPLIANCE, &compliance),
        ]
        .into_iter()
        .filter_map(|(name, mean)| mean.value().map(|v| PerformanceMetric::new(name, v)))
        .collect();

        for (name, mean) in explicit {
            let Some(value) = mean.value() else { continue };
            match metrics.iter_mut().find(|m| m.metric_name == name) {
                Some(existing) => existing.value = value,
                None => metrics.push(PerformanceMetric::new(name, value)),
            }
        }

        tracing::debug!(
            source = self.name(),
            updates = updates.len(),
            metrics = metrics.len(),
            "Computed performance metrics"
        );
        metrics
    }
}
