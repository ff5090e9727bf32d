use super::{exit_codes, AppContext};
use crate::cli::args::AuditArgs;
use anyhow::Context;
use geolens_core::engine::{AuditRunner, AuditSummary};
use geolens_core::providers::llm::fake::FakeClient;
use geolens_core::providers::llm::{clients_from_settings, LlmClient};
use std::sync::Arc;

pub async fn run(args: AuditArgs, ctx: &AppContext) -> anyhow::Result<i32> {
    let date = args
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let targets = ctx.targets().load().await;

    let clients: Vec<Arc<dyn LlmClient>> = match &args.replay_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read replay file {}", path.display()))?;
            vec![Arc::new(FakeClient::fixed("replay", text))]
        }
        None => {
            if !targets.is_empty() && ctx.settings.enabled_providers().is_empty() {
                let envs: Vec<&str> = ctx.settings.providers.iter().map(|p| p.key_env()).collect();
                eprintln!(
                    "config error: no model provider is configured with an API key (set {})",
                    envs.join(" or ")
                );
                return Ok(exit_codes::CONFIG_ERROR);
            }
            clients_from_settings(&ctx.settings.providers)
        }
    };

    let runner = AuditRunner::new(ctx.history(), clients, ctx.settings.parallel());
    let summary = runner.run(&targets, date).await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary));
    }

    if !targets.is_empty() && summary.responses == 0 {
        return Ok(exit_codes::AUDIT_FAILED);
    }
    Ok(exit_codes::OK)
}

fn render_summary(s: &AuditSummary) -> String {
    let mut out = String::new();
    let date = s.date.map(|d| d.to_string()).unwrap_or_default();
    if s.targets == 0 {
        out.push_str("No targets found in config.\n");
        return out;
    }
    out.push_str(&format!("Audit {date}\n"));
    out.push_str(&format!("Targets:   {}\n", s.targets));
    out.push_str(&format!("Responses: {}\n", s.responses));
    out.push_str(&format!("Rows:      {}\n", s.rows_appended));
    if s.failures.is_empty() {
        out.push_str("✅ Data saved\n");
    } else {
        out.push_str(&format!("Failures:  {}\n", s.failures.len()));
        for f in &s.failures {
            out.push_str(&format!("  ❌ {} / {}: {}\n", f.brand, f.provider, f.reason));
        }
    }
    out
}
