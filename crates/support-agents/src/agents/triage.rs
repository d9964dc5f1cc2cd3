//! Keyword-driven triage.
//!
//! Each category has a table of whole-word cues. The category with the most
//! distinct matching cues wins:
//!
//! | Outcome | Confidence |
//! |---|---|
//! | one winner with `n` cues | `min(0.8 + 0.05 * (n - 1), 0.95)` |
//! | tie for most cues | 0.6 (first tied category in table order) |
//! | no cue at all | 0.5, `general` |
//!
//! Priority is `High` on any urgency cue in the text or an escalation cue in
//! the customer history, otherwise `Medium` for technical and billing and
//! `Low` for general.

use std::sync::LazyLock;

use coordination::{Category, InquiryMetadata, Priority, TriageRequest, TriageResult};
use regex::Regex;

const TECHNICAL_CUES: &[&str] = &[
    "password", "forgot", "login", "log in", "sign in", "locked out", "error", "crash",
    "crashes", "bug", "not working", "broken", "install", "update", "app", "website",
    "connection", "two-factor", "2fa", "reset",
];

const BILLING_CUES: &[&str] = &[
    "invoice", "bill", "billing", "billed", "charge", "charged", "overcharged", "refund",
    "payment", "subscription", "price", "pricing", "receipt", "credit card", "renewal",
];

const GENERAL_CUES: &[&str] = &[
    "hours", "office", "location", "address", "contact", "feedback", "partnership",
    "careers", "information", "question",
];

const URGENCY_CUES: &[&str] = &[
    "urgent", "asap", "immediately", "emergency", "outage", "locked out", "fraud",
    "hacked", "security breach", "cannot access", "can't access", "data loss",
];

const HISTORY_CUES: &[&str] = &["vip", "premium", "escalated", "escalation", "churn risk", "complaint"];

struct CueTable {
    category: Category,
    cues: Vec<Regex>,
}

fn compile(cues: &[&str]) -> Vec<Regex> {
    cues.iter()
        .map(|cue| {
            crate::agents::knowledge::word_pattern(cue)
                .unwrap_or_else(|e| panic!("triage cue `{cue}` should compile: {e}"))
        })
        .collect()
}

static CATEGORY_TABLES: LazyLock<Vec<CueTable>> = LazyLock::new(|| {
    vec![
        CueTable {
            category: Category::Technical,
            cues: compile(TECHNICAL_CUES),
        },
        CueTable {
            category: Category::Billing,
            cues: compile(BILLING_CUES),
        },
        CueTable {
            category: Category::General,
            cues: compile(GENERAL_CUES),
        },
    ]
});

static URGENCY: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(URGENCY_CUES));
static HISTORY: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(HISTORY_CUES));

/// Confidence for a unique winner with `matches` distinct cues.
pub fn winner_confidence(matches: usize) -> f64 {
    let extra = matches.saturating_sub(1) as f64;
    (0.8 + 0.05 * extra).min(0.95)
}

pub const TIE_CONFIDENCE: f64 = 0.6;
pub const NO_MATCH_CONFIDENCE: f64 = 0.5;

/// Category scores in table order.
pub fn score(text: &str) -> Vec<(Category, usize)> {
    CATEGORY_TABLES
        .iter()
        .map(|table| {
            let hits = table.cues.iter().filter(|re| re.is_match(text)).count();
            (table.category, hits)
        })
        .collect()
}

/// Pick a category and confidence from the inquiry text.
pub fn categorize(text: &str) -> (Category, f64) {
    let scores = score(text);
    let top = scores.iter().map(|(_, n)| *n).max().unwrap_or(0);
    if top == 0 {
        return (Category::General, NO_MATCH_CONFIDENCE);
    }

    let mut leaders = scores.iter().filter(|(_, n)| *n == top);
    let Some((winner, _)) = leaders.next() else {
        return (Category::General, NO_MATCH_CONFIDENCE);
    };
    if leaders.next().is_some() {
        (*winner, TIE_CONFIDENCE)
    } else {
        (*winner, winner_confidence(top))
    }
}

/// Assign a priority from the text, the customer history and the category.
pub fn prioritize(text: &str, metadata: &InquiryMetadata, category: Category) -> Priority {
    let urgent = URGENCY.iter().any(|re| re.is_match(text));
    let flagged_history = metadata
        .customer_history()
        .is_some_and(|history| HISTORY.iter().any(|re| re.is_match(history)));

    if urgent || flagged_history {
        Priority::High
    } else {
        match category {
            Category::Technical | Category::Billing => Priority::Medium,
            Category::General => Priority::Low,
        }
    }
}

/// Triage an inquiry.
pub fn classify(request: &TriageRequest) -> TriageResult {
    let text = request.inquiry_text();
    let (category, confidence) = categorize(text);
    let priority = prioritize(text, request.metadata(), category);

    tracing::debug!(
        category = %category,
        priority = %priority,
        confidence,
        "Inquiry classified"
    );

    TriageResult::new(category, priority, confidence, request.metadata().clone())
        .unwrap_or_else(|_| TriageResult::fallback(request.metadata().clone()))
}
