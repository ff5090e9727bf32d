use super::LlmClient;
use crate::model::LlmResponse;
use async_trait::async_trait;
use serde_json::json;

/// Canned responses for tests and offline demos.
///
/// A prompt matching a `(needle, response)` rule (substring match) gets that
/// response; anything else gets the fallback, or an error if there is none.
pub struct FakeClient {
    name: &'static str,
    rules: Vec<(String, String)>,
    fallback: Option<String>,
}

impl FakeClient {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rules: Vec::new(),
            fallback: None,
        }
    }

    pub fn fixed(name: &'static str, response: impl Into<String>) -> Self {
        Self::new(name).with_fallback(response)
    }

    pub fn with_rule(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), response.into()));
        self
    }

    pub fn with_fallback(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(response.into());
        self
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<LlmResponse> {
        let text = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, resp)| resp.clone())
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| anyhow::anyhow!("fake provider {} has no response for prompt", self.name))?;

        Ok(LlmResponse {
            text,
            provider: self.name.to_string(),
            model: "fake".to_string(),
            meta: json!({}),
        })
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}
