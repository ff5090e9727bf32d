use crate::config::{ProviderKind, ProviderSettings};
use crate::model::LlmResponse;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<LlmResponse>;
    fn provider_name(&self) -> &'static str;
}

pub mod fake;
pub mod gemini;
pub mod openai;

/// One client per provider that has a key. Providers without one are
/// skipped with a log line, as the audit can still run on the rest.
pub fn clients_from_settings(providers: &[ProviderSettings]) -> Vec<Arc<dyn LlmClient>> {
    let mut out: Vec<Arc<dyn LlmClient>> = Vec::new();
    for p in providers {
        let Some(key) = p.api_key.clone().filter(|k| !k.is_empty()) else {
            tracing::info!(
                event = "geolens.provider.disabled",
                provider = ?p.name,
                key_env = %p.key_env(),
                "no API key; provider skipped"
            );
            continue;
        };
        let client: Arc<dyn LlmClient> = match p.name {
            ProviderKind::Openai => Arc::new(openai::OpenAIClient::new(
                p.model().to_string(),
                key,
                p.temperature(),
            )),
            ProviderKind::Gemini => Arc::new(gemini::GeminiClient::new(
                p.model().to_string(),
                key,
                p.temperature(),
            )),
        };
        out.push(client);
    }
    out
}
