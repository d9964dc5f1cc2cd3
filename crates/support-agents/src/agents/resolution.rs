//! Resolution drafting and the knowledge-gated disposition rule.

use coordination::{Category, KnowledgeLookupResult, ResolutionResult, SupportResult, TriageResult};
use tracing::info;

use super::knowledge::is_hit;

/// Draft a reply from the knowledge lookup.
///
/// A hit resolves the ticket with the article text; a miss escalates to
/// `escalation_channel`.
pub fn draft(
    ticket: &TriageResult,
    evidence: &KnowledgeLookupResult,
    escalation_channel: &str,
) -> SupportResult<ResolutionResult> {
    if is_hit(evidence) {
        let reply = format!("Thanks for reaching out. {}", evidence.result.trim());
        let notes = format!(
            "Resolved from knowledge base ({} / {} priority).",
            ticket.category(),
            ticket.priority()
        );
        return ResolutionResult::resolved(reply, Some(notes));
    }

    let team = match ticket.category() {
        Category::Technical => "technical support",
        Category::Billing => "billing",
        Category::General => "customer care",
    };
    ResolutionResult::escalated(
        format!(
            "Thanks for your patience. We've passed your request to our {team} team, \
and a specialist will follow up with you shortly."
        ),
        Some(format!(
            "No knowledge base article found; escalated to {team} ({} priority).",
            ticket.priority()
        )),
        escalation_channel,
    )
}

/// Apply the disposition rule: after a lookup miss the ticket must be
/// escalated, whatever the engine said.
pub fn enforce_disposition(
    result: ResolutionResult,
    evidence: &KnowledgeLookupResult,
    escalation_channel: &str,
) -> SupportResult<ResolutionResult> {
    if is_hit(evidence) || result.is_escalated() {
        return Ok(result);
    }
    info!(
        claimed = %result.ticket_status(),
        channel = escalation_channel,
        "Knowledge lookup missed; converting reply to escalation"
    );
    result.escalate(escalation_channel)
}
