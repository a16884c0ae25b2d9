// src/agent/keywords.rs
// Keyword vocabularies behind the deterministic routing path. Each domain owns
// an ordered list of patterns over common family-organizer vocabulary; scoring
// counts distinct matching patterns, not total occurrences.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::agent::types::Domain;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).expect("invalid keyword pattern"))
        .collect()
}

/// Pattern tables for the four real domains, in tie-break priority order.
pub static DOMAIN_PATTERNS: Lazy<Vec<(Domain, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (
            Domain::Tasks,
            compile(&[
                r"\btasks?\b",
                r"\bto-?dos?\b",
                r"\bremind(er)?s?\b",
                r"\bchores?\b",
                r"\bdue\b",
                r"\bdeadline\b",
                r"\bfinish\b",
                r"\bassign\b",
            ]),
        ),
        (
            Domain::Calendar,
            compile(&[
                r"\bcalendar\b",
                r"\bevents?\b",
                r"\bappointments?\b",
                r"\bschedule\b",
                r"\bmeetings?\b",
                r"\bbirthday\b",
                r"\brecurring\b",
                r"\b(this|next) (week|month|weekend)\b",
            ]),
        ),
        (
            Domain::Meals,
            compile(&[
                r"\bmeals?\b",
                r"\brecipes?\b",
                r"\bcook(ing)?\b",
                r"\bdinner\b",
                r"\blunch\b",
                r"\bbreakfast\b",
                r"\bmenu\b",
                r"\bmeal plan\b",
            ]),
        ),
        (
            Domain::Lists,
            compile(&[
                r"\blists?\b",
                r"\bshopping\b",
                r"\bgrocer(y|ies)\b",
                r"\bbuy\b",
                r"\bpick up\b",
                r"\bout of\b",
                r"\brunning low\b",
            ]),
        ),
    ]
});

/// Linguistic signals that one message actually chains two requests.
/// Mentioning two domain-adjacent words is not enough on its own.
static MULTI_INTENT_INDICATORS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\band also\b",
        r"\band then\b",
        r"\bas well as\b",
        r"\bplus\b",
        r"\bafter that\b",
        r",\s*(also|and|then)\b",
        r";\s*(also|and|then)?\b",
    ])
});

/// Count distinct matching patterns per real domain. Unknown never scores.
pub fn domain_scores(message: &str) -> Vec<(Domain, usize)> {
    DOMAIN_PATTERNS
        .iter()
        .map(|(domain, patterns)| {
            let score = patterns.iter().filter(|p| p.is_match(message)).count();
            (*domain, score)
        })
        .collect()
}

pub fn has_multi_intent_indicator(message: &str) -> bool {
    MULTI_INTENT_INDICATORS.iter().any(|p| p.is_match(message))
}
