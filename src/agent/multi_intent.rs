// src/agent/multi_intent.rs
// Decides, before single-domain routing runs, whether one message actually
// requests actions across two or more domains. Single-intent is always the
// safe fallback: classifier trouble or ambiguity degrades to "not multi".

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::agent::keywords::{domain_scores, has_multi_intent_indicator};
use crate::agent::types::Domain;
use crate::config::CONFIG;
use crate::llm::IntentClassifier;

/// Messages shorter than this cannot meaningfully contain two requests.
const MIN_MESSAGE_CHARS: usize = 5;

#[derive(Debug, Clone)]
pub struct MultiIntentResult {
    pub is_multi_intent: bool,
    pub domains: Vec<Domain>,
    pub reasons: Vec<String>,
}

impl MultiIntentResult {
    fn single(reason: impl Into<String>) -> Self {
        Self {
            is_multi_intent: false,
            domains: Vec::new(),
            reasons: vec![reason.into()],
        }
    }
}

pub struct MultiIntentDetector {
    classifier: Option<Arc<dyn IntentClassifier>>,
    classifier_timeout: Duration,
}

impl MultiIntentDetector {
    pub fn new(classifier: Option<Arc<dyn IntentClassifier>>) -> Self {
        Self {
            classifier,
            classifier_timeout: Duration::from_millis(CONFIG.classifier_timeout_ms),
        }
    }

    pub fn keyword_only() -> Self {
        Self::new(None)
    }

    pub async fn detect(&self, message: &str) -> MultiIntentResult {
        if message.trim().chars().count() < MIN_MESSAGE_CHARS {
            return MultiIntentResult::single("message too short to split");
        }

        let Some(classifier) = &self.classifier else {
            return detect_heuristic(message);
        };

        match tokio::time::timeout(self.classifier_timeout, classifier.classify(message)).await {
            Ok(Ok(c)) => {
                // Order-preserving distinct: a repeated domain must not fan
                // out twice.
                let mut seen = HashSet::new();
                let domains: Vec<Domain> = c
                    .multi_domains
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|d| *d != Domain::Unknown)
                    .filter(|d| seen.insert(*d))
                    .collect();

                if c.is_multi_intent && domains.len() >= 2 {
                    debug!("Classifier flagged multi-intent across {:?}", domains);
                    MultiIntentResult {
                        is_multi_intent: true,
                        domains,
                        reasons: if c.reasons.is_empty() {
                            vec!["classifier flagged multiple domains".to_string()]
                        } else {
                            c.reasons
                        },
                    }
                } else {
                    MultiIntentResult::single("classifier saw a single domain")
                }
            }
            Ok(Err(e)) => {
                warn!("Multi-intent classification failed: {}", e);
                MultiIntentResult::single(format!("detection failed: {}", e))
            }
            Err(_) => {
                warn!("Multi-intent classification timed out");
                MultiIntentResult::single("detection failed: classifier timeout")
            }
        }
    }
}

/// Heuristic detection: declare multi-intent only when at least two domains
/// score a keyword match AND the message carries a chaining indicator. The
/// conjunction requirement prevents false positives on messages that merely
/// mention two domain-adjacent words.
pub fn detect_heuristic(message: &str) -> MultiIntentResult {
    let scored: Vec<Domain> = domain_scores(message)
        .into_iter()
        .filter(|(_, score)| *score >= 1)
        .map(|(domain, _)| domain)
        .collect();

    if scored.len() < 2 {
        return MultiIntentResult::single("fewer than two domains matched");
    }
    if !has_multi_intent_indicator(message) {
        return MultiIntentResult::single("no multi-intent indicator present");
    }

    MultiIntentResult {
        is_multi_intent: true,
        reasons: vec![format!(
            "{} domains matched with a chaining indicator",
            scored.len()
        )],
        domains: scored,
    }
}
