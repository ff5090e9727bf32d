use crate::errors::NormalizeError;
use crate::model::{AuditRow, TrackedTarget};
use crate::normalize::{normalize_response, RunContext};
use crate::prompts::audit_prompt;
use crate::providers::llm::LlmClient;
use crate::storage::HistoryStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditFailure {
    pub brand: String,
    pub provider: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditSummary {
    pub date: Option<NaiveDate>,
    pub targets: usize,
    pub responses: usize,
    pub rows_appended: usize,
    pub failures: Vec<AuditFailure>,
}

enum TaskOutcome {
    Rows(Vec<AuditRow>),
    Failed(AuditFailure),
}

pub struct AuditRunner {
    pub history: HistoryStore,
    pub clients: Vec<Arc<dyn LlmClient>>,
    pub parallel: usize,
}

impl AuditRunner {
    pub fn new(history: HistoryStore, clients: Vec<Arc<dyn LlmClient>>, parallel: usize) -> Self {
        Self {
            history,
            clients,
            parallel: parallel.max(1),
        }
    }

    /// Query every provider for every target, then append all parsed rows in
    /// one write. A bad response only drops that (target, provider) pair.
    pub async fn run(&self, targets: &[TrackedTarget], date: NaiveDate) -> anyhow::Result<AuditSummary> {
        let (rows, mut summary) = self.collect_rows(targets, date).await;
        if rows.is_empty() {
            tracing::info!(event = "geolens.audit.nothing_to_save", date = %date);
            return Ok(summary);
        }
        summary.rows_appended = self.history.append(&rows).await?;
        Ok(summary)
    }

    /// Everything `run` does except the write.
    pub async fn collect_rows(
        &self,
        targets: &[TrackedTarget],
        date: NaiveDate,
    ) -> (Vec<AuditRow>, AuditSummary) {
        let mut summary = AuditSummary {
            date: Some(date),
            targets: targets.len(),
            ..Default::default()
        };

        if targets.is_empty() {
            tracing::warn!(event = "geolens.audit.no_targets", "No targets found in config.");
            return (Vec::new(), summary);
        }
        if self.clients.is_empty() {
            tracing::warn!(event = "geolens.audit.no_providers", "No model providers configured.");
            return (Vec::new(), summary);
        }

        let sem = Arc::new(Semaphore::new(self.parallel));
        let mut handles = Vec::new();

        for target in targets {
            tracing::info!(event = "geolens.audit.target", brand = %target.brand, "auditing");
            let prompt = Arc::new(audit_prompt(target));
            for client in &self.clients {
                let sem = sem.clone();
                let client = client.clone();
                let label = (target.brand.clone(), client.provider_name().to_string());
                let target = target.clone();
                let prompt = prompt.clone();
                let h = tokio::spawn(async move {
                    let _permit = sem.acquire_owned().await.ok();
                    run_pair(client.as_ref(), &target, &prompt, date).await
                });
                handles.push((label, h));
            }
        }

        let mut rows = Vec::new();
        for ((brand, provider), h) in handles {
            match h.await {
                Ok(TaskOutcome::Rows(mut r)) => {
                    summary.responses += 1;
                    rows.append(&mut r);
                }
                Ok(TaskOutcome::Failed(f)) => summary.failures.push(f),
                Err(e) => summary.failures.push(AuditFailure {
                    brand,
                    provider,
                    reason: format!("join error: {}", e),
                }),
            }
        }

        (rows, summary)
    }
}

async fn run_pair(
    client: &dyn LlmClient,
    target: &TrackedTarget,
    prompt: &str,
    date: NaiveDate,
) -> TaskOutcome {
    let provider = client.provider_name();
    let failed = |reason: String| {
        TaskOutcome::Failed(AuditFailure {
            brand: target.brand.clone(),
            provider: provider.to_string(),
            reason,
        })
    };

    let Some(text) = ask(client, prompt).await else {
        return failed("no response".into());
    };

    let ctx = RunContext::new(
        &target.brand,
        &target.category,
        &target.use_case,
        date,
        Some(provider),
    );
    match process_response(&text, &ctx) {
        Ok(rows) => TaskOutcome::Rows(rows),
        Err(e) => failed(e.to_string()),
    }
}

/// `complete` with errors logged and flattened to `None`.
pub async fn ask(client: &dyn LlmClient, prompt: &str) -> Option<String> {
    match client.complete(prompt).await {
        Ok(resp) => Some(resp.text),
        Err(e) => {
            tracing::warn!(
                event = "geolens.audit.provider_error",
                provider = client.provider_name(),
                error = %format!("{e:#}"),
            );
            None
        }
    }
}

/// Normalize one response, logging the failure if it cannot be parsed.
pub fn process_response(text: &str, ctx: &RunContext) -> Result<Vec<AuditRow>, NormalizeError> {
    match normalize_response(text, ctx) {
        Ok(rows) => {
            tracing::debug!(
                event = "geolens.audit.parsed",
                run_id = %ctx.run_id,
                rows = rows.len(),
            );
            Ok(rows)
        }
        Err(e) => {
            tracing::warn!(
                event = "geolens.audit.parse_failed",
                brand = %ctx.brand,
                provider = %ctx.provider.as_deref().unwrap_or("unknown"),
                error = %e,
                "Failed to parse JSON"
            );
            Err(e)
        }
    }
}
