use super::LlmClient;
use crate::model::LlmResponse;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct GeminiClient {
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(model: String, api_key: String, temperature: f32) -> Self {
        Self {
            model,
            api_key,
            temperature,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            client: reqwest::Client::new(),
        }
    }
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(json: &Value) -> Option<String> {
    let parts = json.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<LlmResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": self.temperature},
        });

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini generateContent error: {}", error_text);
        }

        let json: Value = resp.json().await?;
        let text = candidate_text(&json).ok_or_else(|| {
            let reason = json
                .pointer("/candidates/0/finishReason")
                .and_then(Value::as_str)
                .unwrap_or("no candidates");
            anyhow::anyhow!("Gemini response missing text ({})", reason)
        })?;

        Ok(LlmResponse {
            text,
            provider: "gemini".to_string(),
            model: self.model.clone(),
            meta: json.get("usageMetadata").cloned().unwrap_or_default(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_text_joins_parts() {
        let v = json!({"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]});
        assert_eq!(candidate_text(&v).as_deref(), Some("{\"a\":1}"));
        assert_eq!(candidate_text(&json!({"candidates": []})), None);
    }
}
