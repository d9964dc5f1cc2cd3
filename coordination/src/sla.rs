//! SLA evaluation and dashboard rendering.
//!
//! Every SLA target is a floor: a metric breaches when its observed value is
//! strictly below the target. Metrics without a target are reported but can
//! never breach, and targets without a matching metric are listed as having
//! no data.
//!
//! ```text
//! SLA Dashboard: 3 metrics, 1 breach [ALERT]
//!
//!   [BREACH] sla_compliance: 0.60 (target >= 0.90)
//!   [PASS]   customer_satisfaction: 4.50 (target >= 4.00)
//!   [----]   avg_resolution_time: 3.25 (no target)
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::contracts::{PerformanceMetric, SlaTargets};

/// Outcome of checking one metric against the targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    /// At or above target.
    Met,
    /// Strictly below target.
    Breached,
    /// No target configured for this metric.
    Untracked,
}

impl std::fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Met => write!(f, "met"),
            Self::Breached => write!(f, "breached"),
            Self::Untracked => write!(f, "untracked"),
        }
    }
}

/// Check a single metric against the targets.
pub fn status_of(metric: &PerformanceMetric, targets: &SlaTargets) -> SlaStatus {
    match targets.target(&metric.metric_name) {
        None => SlaStatus::Untracked,
        Some(target) if metric.value < target => SlaStatus::Breached,
        Some(_) => SlaStatus::Met,
    }
}

/// Names of all metrics strictly below their target.
pub fn find_breaches(metrics: &[PerformanceMetric], targets: &SlaTargets) -> BTreeSet<String> {
    metrics
        .iter()
        .filter(|m| status_of(m, targets) == SlaStatus::Breached)
        .map(|m| m.metric_name.clone())
        .collect()
}

/// Render a plain-text dashboard. Output depends only on the arguments.
pub fn render_dashboard(
    metrics: &[PerformanceMetric],
    breaches: &BTreeSet<String>,
    targets: &SlaTargets,
) -> String {
    let mut lines = Vec::with_capacity(metrics.len() + 4);
    lines.push(format!(
        "SLA Dashboard: {} metric{}, {} breach{} [{}]",
        metrics.len(),
        if metrics.len() == 1 { "" } else { "s" },
        breaches.len(),
        if breaches.len() == 1 { "" } else { "es" },
        if breaches.is_empty() { "OK" } else { "ALERT" },
    ));

    if metrics.is_empty() {
        lines.push(String::new());
        lines.push("  No performance data available.".to_string());
    } else {
        lines.push(String::new());
        for metric in metrics {
            let (tag, detail) = match targets.target(&metric.metric_name) {
                None => ("[----]  ", "no target".to_string()),
                Some(target) if breaches.contains(&metric.metric_name) => {
                    ("[BREACH]", format!("target >= {target:.2}"))
                }
                Some(target) => ("[PASS]  ", format!("target >= {target:.2}")),
            };
            lines.push(format!(
                "  {tag} {}: {:.2} ({detail})",
                metric.metric_name, metric.value
            ));
        }
    }

    let missing: Vec<&str> = targets
        .iter()
        .map(|(name, _)| name)
        .filter(|name| !metrics.iter().any(|m| m.metric_name == *name))
        .collect();
    if !missing.is_empty() {
        lines.push(String::new());
        lines.push(format!("  No data for: {}", missing.join(", ")));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn targets(pairs: &[(&str, f64)]) -> SlaTargets {
        let map: BTreeMap<String, f64> = pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect();
        SlaTargets::new(map).unwrap()
    }

    #[test]
    fn test_breach_is_strictly_below_target() {
        let t = targets(&[("sla_compliance", 0.9)]);
        assert_eq!(
            status_of(&PerformanceMetric::new("sla_compliance", 0.9), &t),
            SlaStatus::Met
        );
        assert_eq!(
            status_of(&PerformanceMetric::new("sla_compliance", 0.8999), &t),
            SlaStatus::Breached
        );
    }

    #[test]
    fn test_untracked_metric_never_breaches() {
        let t = targets(&[("sla_compliance", 0.9)]);
        let metrics = vec![PerformanceMetric::new("avg_resolution_time", -100.0)];
        assert!(find_breaches(&metrics, &t).is_empty());
        assert_eq!(status_of(&metrics[0], &t), SlaStatus::Untracked);
    }

    #[test]
    fn test_find_breaches_collects_names() {
        let t = targets(&[("sla_compliance", 0.9), ("customer_satisfaction", 4.0)]);
        let metrics = vec![
            PerformanceMetric::new("sla_compliance", 0.6),
            PerformanceMetric::new("customer_satisfaction", 3.0),
            PerformanceMetric::new("avg_resolution_time", 5.0),
        ];
        let breaches = find_breaches(&metrics, &t);
        assert_eq!(
            breaches.into_iter().collect::<Vec<_>>(),
            vec!["customer_satisfaction".to_string(), "sla_compliance".to_string()]
        );
    }

    #[test]
    fn test_dashboard_is_deterministic() {
        let t = targets(&[("sla_compliance", 0.9), ("first_response", 1.0)]);
        let metrics = vec![PerformanceMetric::new("sla_compliance", 0.6)];
        let breaches = find_breaches(&metrics, &t);
        let a = render_dashboard(&metrics, &breaches, &t);
        let b = render_dashboard(&metrics, &breaches, &t);
        assert_eq!(a, b);
        assert!(a.starts_with("SLA Dashboard: 1 metric, 1 breach [ALERT]"));
        assert!(a.contains("[BREACH] sla_compliance: 0.60 (target >= 0.90)"));
        assert!(a.contains("No data for: first_response"));
    }

    #[test]
    fn test_dashboard_without_metrics() {
        let text = render_dashboard(&[], &BTreeSet::new(), &SlaTargets::default());
        assert!(text.contains("[OK]"));
        assert!(text.contains("No performance data available."));
    }
}
