// src/agent/router.rs
// Maps one free-text message (+ optional explicit hint) to a single domain
// with a confidence score and supporting reasons.
//
// Hints always win. With a classifier configured the router is
// classifier-backed and degrades to unknown/0.0 on any provider failure, so a
// broken classifier can never crash a turn. Without one it falls back to
// deterministic keyword scoring.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::agent::keywords::domain_scores;
use crate::agent::types::{Domain, IntentRoute};
use crate::config::CONFIG;
use crate::llm::IntentClassifier;

pub struct IntentRouter {
    classifier: Option<Arc<dyn IntentClassifier>>,
    classifier_timeout: Duration,
}

impl IntentRouter {
    pub fn new(classifier: Option<Arc<dyn IntentClassifier>>) -> Self {
        Self {
            classifier,
            classifier_timeout: Duration::from_millis(CONFIG.classifier_timeout_ms),
        }
    }

    pub fn keyword_only() -> Self {
        Self::new(None)
    }

    /// Route one message. Never fails; routing trouble degrades to `unknown`.
    pub async fn route(&self, message: &str, domain_hint: Option<Domain>) -> IntentRoute {
        if let Some(hint) = domain_hint {
            if hint != Domain::Unknown {
                return IntentRoute {
                    domain: hint,
                    confidence: 0.95,
                    reasons: vec![format!("explicit domain hint: {}", hint)],
                };
            }
        }

        let Some(classifier) = &self.classifier else {
            return route_keywords(message);
        };

        match tokio::time::timeout(self.classifier_timeout, classifier.classify(message)).await {
            Ok(Ok(c)) => {
                debug!(
                    "Classifier routed to {} (confidence {:.2})",
                    c.domain, c.confidence
                );
                IntentRoute {
                    domain: c.domain,
                    confidence: c.confidence.clamp(0.0, 1.0),
                    reasons: if c.reasons.is_empty() {
                        vec!["classifier decision".to_string()]
                    } else {
                        c.reasons
                    },
                }
            }
            Ok(Err(e)) => {
                warn!("Intent classification failed: {}", e);
                unknown_route(format!("routing failed: {}", e))
            }
            Err(_) => {
                warn!(
                    "Intent classification timed out after {}ms",
                    self.classifier_timeout.as_millis()
                );
                unknown_route("routing failed: classifier timeout".to_string())
            }
        }
    }
}

fn unknown_route(reason: String) -> IntentRoute {
    IntentRoute {
        domain: Domain::Unknown,
        confidence: 0.0,
        reasons: vec![reason],
    }
}

/// Deterministic keyword routing. Rewards an unambiguous single-domain match
/// and caps confidence below certainty.
pub fn route_keywords(message: &str) -> IntentRoute {
    let scores = domain_scores(message);
    let total: usize = scores.iter().map(|(_, s)| s).sum();

    let mut best: Option<(Domain, usize)> = None;
    for (domain, score) in &scores {
        if *score > 0 && best.map_or(true, |(_, b)| *score > b) {
            best = Some((*domain, *score));
        }
    }

    match best {
        Some((domain, score)) => {
            let confidence = (score as f32 / (total as f32 + 1.0) + 0.3).min(0.9);
            IntentRoute {
                domain,
                confidence,
                reasons: vec![format!(
                    "{} of {} keyword matches point at {}",
                    score, total, domain
                )],
            }
        }
        None => unknown_route("no domain keywords matched".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::IntentClassification;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FixedClassifier(Domain, f32);

    #[async_trait]
    impl IntentClassifier for FixedClassifier {
        async fn classify(&self, _message: &str) -> anyhow::Result<IntentClassification> {
            Ok(IntentClassification {
                domain: self.0,
                confidence: self.1,
                reasons: vec!["fixed".into()],
                is_multi_intent: false,
                multi_domains: None,
            })
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl IntentClassifier for BrokenClassifier {
        async fn classify(&self, _message: &str) -> anyhow::Result<IntentClassification> {
            Err(anyhow!("provider unreachable"))
        }
    }

    #[tokio::test]
    async fn test_domain_hint_short_circuits() {
        let router = IntentRouter::new(Some(Arc::new(FixedClassifier(Domain::Meals, 0.9))));
        let route = router
            .route("what's for dinner", Some(Domain::Calendar))
            .await;
        assert_eq!(route.domain, Domain::Calendar);
        assert_eq!(route.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_unknown_hint_does_not_short_circuit() {
        let router = IntentRouter::keyword_only();
        let route = router.route("plan dinner tonight", Some(Domain::Unknown)).await;
        assert_eq!(route.domain, Domain::Meals);
    }

    #[tokio::test]
    async fn test_classifier_decision_passes_through() {
        let router = IntentRouter::new(Some(Arc::new(FixedClassifier(Domain::Lists, 0.82))));
        let route = router.route("we need things", None).await;
        assert_eq!(route.domain, Domain::Lists);
        assert!((route.confidence - 0.82).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_classifier_failure_degrades_to_unknown() {
        let router = IntentRouter::new(Some(Arc::new(BrokenClassifier)));
        let route = router.route("remind me to call mom", None).await;
        assert_eq!(route.domain, Domain::Unknown);
        assert_eq!(route.confidence, 0.0);
        assert!(route.reasons[0].contains("routing failed"));
    }

    #[test]
    fn test_keyword_confidence_formula() {
        // Three matches, all in one domain: 3/(3+1) + 0.3 caps at 0.9.
        let route = route_keywords("remind me about the task deadline");
        assert_eq!(route.domain, Domain::Tasks);
        assert!((route.confidence - 0.9).abs() < 1e-6);

        // One match total: 1/(1+1) + 0.3 = 0.8.
        let route = route_keywords("put it on the schedule");
        assert_eq!(route.domain, Domain::Calendar);
        assert!((route.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_no_keywords_routes_unknown() {
        let route = route_keywords("hmm");
        assert_eq!(route.domain, Domain::Unknown);
        assert_eq!(route.confidence, 0.0);
    }

    #[test]
    fn test_keyword_tie_prefers_earlier_domain() {
        // "task" and "buy" score one each; tasks is listed first.
        let route = route_keywords("Create a task to buy milk");
        assert_eq!(route.domain, Domain::Tasks);
    }
}
