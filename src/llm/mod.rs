// src/llm/mod.rs
// Abstract "complete JSON against a schema" interface for intent
// classification. The agent core only depends on the trait; the Gemini-backed
// provider lives in `gemini.rs` and tests substitute fakes.

pub mod gemini;

pub use gemini::GeminiClassifier;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;

use crate::agent::types::Domain;

/// Structured result a classification provider must produce.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentClassification {
    pub domain: Domain,
    pub confidence: f32,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub is_multi_intent: bool,
    #[serde(default)]
    pub multi_domains: Option<Vec<Domain>>,
}

/// Reject out-of-contract provider output before the router trusts it.
pub fn validate_classification(c: &IntentClassification) -> Result<()> {
    if !(0.0..=1.0).contains(&c.confidence) {
        return Err(anyhow!(
            "confidence {} outside [0, 1]",
            c.confidence
        ));
    }
    if let Some(domains) = &c.multi_domains {
        if c.is_multi_intent && domains.len() < 2 {
            return Err(anyhow!(
                "isMultiIntent=true requires at least 2 multiDomains, got {}",
                domains.len()
            ));
        }
        if domains.contains(&Domain::Unknown) {
            return Err(anyhow!("multiDomains may not contain 'unknown'"));
        }
        let mut seen = HashSet::new();
        for domain in domains {
            if !seen.insert(domain) {
                return Err(anyhow!("multiDomains contains '{}' more than once", domain));
            }
        }
    }
    Ok(())
}

/// A pluggable classification provider. Implementations complete a structured
/// JSON result against the classification schema for one free-text message.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, message: &str) -> Result<IntentClassification>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let c = IntentClassification {
            domain: Domain::Tasks,
            confidence: 1.3,
            reasons: vec![],
            is_multi_intent: false,
            multi_domains: None,
        };
        assert!(validate_classification(&c).is_err());
    }

    #[test]
    fn test_validate_requires_two_multi_domains() {
        let c = IntentClassification {
            domain: Domain::Tasks,
            confidence: 0.8,
            reasons: vec![],
            is_multi_intent: true,
            multi_domains: Some(vec![Domain::Tasks]),
        };
        assert!(validate_classification(&c).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_multi_domains() {
        let c = IntentClassification {
            domain: Domain::Tasks,
            confidence: 0.8,
            reasons: vec![],
            is_multi_intent: true,
            multi_domains: Some(vec![Domain::Tasks, Domain::Lists, Domain::Tasks]),
        };
        assert!(validate_classification(&c).is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let c = IntentClassification {
            domain: Domain::Lists,
            confidence: 0.85,
            reasons: vec!["mentions groceries".into()],
            is_multi_intent: true,
            multi_domains: Some(vec![Domain::Lists, Domain::Tasks]),
        };
        assert!(validate_classification(&c).is_ok());
    }
}
