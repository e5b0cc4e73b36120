use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Marker embedded in the "normalized" text when the external call fails.
/// Failed rows still flow through the batch and into history.
pub const ERROR_TAG: &str = "[AI ERROR]";

const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

const PROMPT_PREFIX: &str = "Rewrite this insurance claim professionally and clearly:";

/// Seam for the external rewriting service. `normalize` is infallible by
/// contract: adapter failures come back as error-tagged text, never as `Err`,
/// so a single bad row cannot abort a batch.
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(&self, text: &str) -> String;
}

pub struct GeminiNormalizer {
    client: Client,
    api_key: String,
}

impl GeminiNormalizer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    async fn generate(&self, text: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(AppError::ConfigError("GEMINI_API_KEY is not set".to_string()));
        }

        let body = json!({
            "contents": [{
                "parts": [{ "text": format!("{}\n\n{}", PROMPT_PREFIX, text) }]
            }]
        });

        let response = self
            .client
            .post(format!("{}?key={}", GEMINI_ENDPOINT, self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await?;

        if !status.is_success() {
            let reason = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown API error")
                .to_string();
            return Err(AppError::NormalizationError(format!("{}: {}", status, reason)));
        }

        extract_candidate_text(&payload)
    }
}

fn extract_candidate_text(payload: &Value) -> Result<String> {
    payload["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|t| t.trim().to_string())
        .ok_or_else(|| AppError::NormalizationError("No text in model response".to_string()))
}

#[async_trait]
impl Normalizer for GeminiNormalizer {
    async fn normalize(&self, text: &str) -> String {
        match self.generate(text).await {
            Ok(cleaned) => cleaned,
            Err(e) => format!("{} {}", ERROR_TAG, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_trims_candidate_text() {
        let payload = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "  The claimant reports water damage.  " }] }
            }]
        });
        assert_eq!(
            extract_candidate_text(&payload).unwrap(),
            "The claimant reports water damage."
        );
    }

    #[test]
    fn missing_candidates_is_an_error() {
        let payload = serde_json::json!({ "candidates": [] });
        assert!(extract_candidate_text(&payload).is_err());
    }

    #[tokio::test]
    async fn missing_api_key_embeds_error_tag() {
        let normalizer = GeminiNormalizer::new(String::new());
        let out = normalizer.normalize("flooded basement").await;
        assert!(out.starts_with(ERROR_TAG));
    }
}
