use super::{exit_codes, AppContext};
use crate::cli::args::{TargetsArgs, TargetsSub};
use geolens_core::model::TrackedTarget;

pub async fn run(args: TargetsArgs, ctx: &AppContext) -> anyhow::Result<i32> {
    let list = ctx.targets();
    match args.cmd {
        TargetsSub::List { format } => {
            let targets = list.try_load().await?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&targets)?);
            } else if targets.is_empty() {
                println!("no targets tracked");
            } else {
                println!("{:<24} {:<24} {}", "BRAND", "CATEGORY", "USE CASE");
                for t in &targets {
                    println!("{:<24} {:<24} {}", t.brand, t.category, t.use_case);
                }
            }
        }
        TargetsSub::Add {
            brand,
            category,
            use_case,
        } => {
            let target = TrackedTarget::new(brand.trim(), category.trim(), use_case.trim());
            if target.brand.is_empty() || target.category.is_empty() || target.use_case.is_empty() {
                eprintln!("brand, category and use case must not be empty");
                return Ok(exit_codes::CONFIG_ERROR);
            }
            if list.add(target.clone()).await? {
                eprintln!(
                    "tracking added: {} ({} / {})",
                    target.brand, target.category, target.use_case
                );
            } else {
                eprintln!(
                    "note: {} ({} / {}) is already tracked",
                    target.brand, target.category, target.use_case
                );
            }
        }
        TargetsSub::Remove {
            brand,
            category,
            use_case,
        } => {
            let removed = list
                .remove(&brand, category.as_deref(), use_case.as_deref())
                .await?;
            if removed == 0 {
                eprintln!("note: no tracked target matches {brand}");
            } else {
                eprintln!("tracking removed: {brand} ({removed} entries)");
            }
        }
    }
    Ok(exit_codes::OK)
}
