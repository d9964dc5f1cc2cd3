//! Contract property tests: grid validation of record invariants.
//!
//! Tests verify:
//! - `clarification_needed` always equals `confidence < 0.8`, however built
//! - `escalation_channel` is present exactly when a ticket is escalated
//! - `alerts_sent` tracks the breach set and breaches are strictly below target
//! - Undeclared fields are rejected before any stage record exists
//! - Coercion never fails and always yields a valid record

use std::collections::BTreeMap;

use coordination::{
    coerce, parse_contract, Category, Channel, Coerced, CoercionPath, InquiryMetadata,
    PerformanceMetric, PerformanceReport, Priority, RawOutput, ResolutionResult, SlaTargets,
    SupportError, TicketStatus, TriageResult, CONFIDENCE_GATE,
};
use serde_json::{json, Value};

const CHANNEL: &str = "slack:#support-escalations";

fn meta() -> InquiryMetadata {
    InquiryMetadata::new(Channel::Chat, "C42", Some("VIP customer".into())).unwrap()
}

/// Confidence values from 0.00 to 1.00 in steps of 0.01.
fn confidence_grid() -> impl Iterator<Item = f64> {
    (0..=100).map(|i| i as f64 / 100.0)
}

#[test]
fn clarification_flag_matches_gate_for_every_constructor() {
    for confidence in confidence_grid() {
        let expected = confidence < CONFIDENCE_GATE;

        let built = TriageResult::new(Category::Technical, Priority::High, confidence, meta())
            .unwrap();
        assert_eq!(built.clarification_needed(), expected, "new() at {confidence}");

        for claimed in [true, false] {
            let parsed: TriageResult = parse_contract(json!({
                "category": "technical",
                "priority": "High",
                "confidence": confidence,
                "ticket_metadata": {"channel": "chat", "customer_id": "C42", "customer_history": null},
                "clarification_needed": claimed
            }))
            .unwrap();
            assert_eq!(parsed.clarification_needed(), expected, "wire at {confidence}");
        }

        let reconstructed: Coerced<TriageResult> = coerce(
            RawOutput::Text(format!("{{\"category\": \"billing\", \"confidence\": {confidence}, \"why\": \"x\"}}")),
            &meta(),
        );
        assert_eq!(reconstructed.path, CoercionPath::Reconstructed);
        assert_eq!(reconstructed.value.clarification_needed(), expected);
    }
}

#[test]
fn escalation_channel_iff_escalated() {
    let statuses = [TicketStatus::Resolved, TicketStatus::Escalated, TicketStatus::Pending];
    let channels = [None, Some(CHANNEL.to_string())];

    for status in statuses {
        for channel in &channels {
            let result = ResolutionResult::new("Reply", status, None, channel.clone());
            let should_accept = (status == TicketStatus::Escalated) == channel.is_some();
            assert_eq!(result.is_ok(), should_accept, "{status} with {channel:?}");
            if let Ok(result) = result {
                assert_eq!(result.is_escalated(), result.escalation_channel().is_some());
            }
        }
    }
}

#[test]
fn alerts_track_breaches_across_value_grid() {
    let mut targets = BTreeMap::new();
    targets.insert("sla_compliance".to_string(), 0.9);
    targets.insert("customer_satisfaction".to_string(), 4.0);
    let targets = SlaTargets::new(targets).unwrap();

    for step in 0..=20 {
        let compliance = step as f64 / 20.0;
        let satisfaction = step as f64 / 4.0;
        let report = PerformanceReport::evaluate(
            vec![
                PerformanceMetric::new("sla_compliance", compliance),
                PerformanceMetric::new("customer_satisfaction", satisfaction),
                PerformanceMetric::new("avg_resolution_time", -1.0),
            ],
            &targets,
        );

        assert_eq!(report.alerts_sent(), !report.sla_breaches().is_empty());
        assert_eq!(report.sla_breaches().contains("sla_compliance"), compliance < 0.9);
        assert_eq!(report.sla_breaches().contains("customer_satisfaction"), satisfaction < 4.0);
        assert!(!report.sla_breaches().contains("avg_resolution_time"));
        for breach in report.sla_breaches() {
            assert!(report.metrics().iter().any(|m| &m.metric_name == breach));
            assert!(targets.target(breach).is_some());
        }
    }
}

#[test]
fn undeclared_fields_rejected_at_every_level() {
    let cases: Vec<(Value, &str)> = vec![
        (
            json!({
                "inquiry_text": "help",
                "metadata": {"channel": "email", "customer_id": "C1"},
                "source": "web"
            }),
            "source",
        ),
        (
            json!({
                "inquiry_text": "help",
                "metadata": {"channel": "email", "customer_id": "C1", "tier": "gold"}
            }),
            "tier",
        ),
    ];

    for (value, field) in cases {
        match parse_contract::<coordination::TriageRequest>(value) {
            Err(SupportError::SchemaViolation { field: got, .. }) => assert_eq!(got, field),
            other => panic!("expected schema violation on {field}, got {other:?}"),
        }
    }
}

#[test]
fn coercion_total_over_hostile_inputs() {
    let inputs = [
        "",
        "null",
        "[]",
        "{",
        "{}",
        "```json\n[1, 2]\n```",
        "{\"category\": 7, \"priority\": [], \"confidence\": \"lots\"}",
        "{\"resolution_reply\": \"\", \"ticket_status\": \"closed\"}",
        "{\"metrics\": \"none\"}",
    ];

    for input in inputs {
        let triage: Coerced<TriageResult> = coerce(RawOutput::Text(input.into()), &meta());
        assert_eq!(triage.path, CoercionPath::Defaulted, "triage on {input:?}");
        assert!(triage.value.clarification_needed());

        let resolution: Coerced<ResolutionResult> =
            coerce(RawOutput::Text(input.into()), CHANNEL);
        assert_eq!(resolution.path, CoercionPath::Defaulted, "resolution on {input:?}");
        assert_eq!(resolution.value.ticket_status(), TicketStatus::Pending);

        let report: Coerced<PerformanceReport> =
            coerce(RawOutput::Text(input.into()), &SlaTargets::default());
        assert_eq!(report.path, CoercionPath::Defaulted, "monitoring on {input:?}");
        assert!(!report.value.alerts_sent());
    }
}
