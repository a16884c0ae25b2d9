// src/llm/gemini.rs
// Gemini-backed intent classifier. One generateContent call per message with a
// fixed system prompt enumerating the five domains; the response is expected
// to be a single JSON object (possibly wrapped in markdown fences).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use super::{validate_classification, IntentClassification, IntentClassifier};
use crate::config::CONFIG;

const CLASSIFIER_PROMPT: &str = r#"Classify this family-organizer message into the single most relevant domain.

Domains:
- tasks: to-dos, reminders, chores, things to finish or assign
- calendar: events, appointments, schedules, meetings
- meals: recipes, meal plans, cooking, dinner/lunch/breakfast ideas
- lists: shopping lists, groceries, things to buy
- unknown: anything else

Also flag whether the message actually requests actions across MORE THAN ONE domain
(for example "add milk to the list and remind me to call mom").

Respond with JSON only:
{"domain": "tasks|calendar|meals|lists|unknown", "confidence": 0.0-1.0,
 "reasons": ["brief explanation"], "isMultiIntent": false,
 "multiDomains": ["tasks", "lists"]}

Omit multiDomains unless isMultiIntent is true."#;

pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClassifier {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(CONFIG.classifier_timeout_ms * 2))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    /// Build a classifier from CONFIG, or None when no API key is configured.
    pub fn from_config() -> Option<Self> {
        if CONFIG.gemini_api_key.is_empty() {
            return None;
        }
        Self::new(CONFIG.gemini_api_key.clone(), CONFIG.classifier_model.clone()).ok()
    }

    async fn call_gemini(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let body = json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": 0.1,
                "maxOutputTokens": 300
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let json: serde_json::Value = response.json().await?;

        let text = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow!("No text in Gemini response"))?;

        Ok(text.to_string())
    }
}

/// Extract the JSON object from a model response that may carry markdown
/// code fences.
fn strip_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[async_trait]
impl IntentClassifier for GeminiClassifier {
    async fn classify(&self, message: &str) -> Result<IntentClassification> {
        let prompt = format!(
            "{}\n\nMessage: \"{}\"",
            CLASSIFIER_PROMPT,
            message.replace('"', "\\\"")
        );

        let response = self.call_gemini(&prompt).await?;
        let classification: IntentClassification =
            serde_json::from_str(strip_fences(&response))?;
        validate_classification(&classification)?;
        Ok(classification)
    }
}
