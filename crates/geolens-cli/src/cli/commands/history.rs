use super::{exit_codes, fmt_opt, AppContext};
use crate::cli::args::{HistoryArgs, HistorySub};
use geolens_core::model::AuditRow;

pub async fn run(args: HistoryArgs, ctx: &AppContext) -> anyhow::Result<i32> {
    let store = ctx.history();
    match args.cmd {
        HistorySub::Show { limit } => {
            let table = store.read().await;
            if table.is_empty() {
                println!("no data available");
                return Ok(exit_codes::OK);
            }
            let rows = table.rows();
            println!(
                "{} rows, {} columns ({})",
                rows.len(),
                table.columns().len(),
                store.path()
            );
            let skip = rows.len().saturating_sub(limit);
            print!("{}", render_rows(&rows[skip..]));
        }
        HistorySub::Clear { yes } => {
            if !yes {
                eprintln!("refusing to clear history without --yes");
                return Ok(exit_codes::CONFIG_ERROR);
            }
            store.clear().await?;
            eprintln!("history cleared: {}", store.path());
        }
    }
    Ok(exit_codes::OK)
}

fn render_rows(rows: &[AuditRow]) -> String {
    let mut out = format!(
        "{:<10}  {:<32}  {:<20}  {:<10}  {:>6}  {:>8}\n",
        "DATE", "RUN", "BRAND", "TYPE", "RANK", "DISTANCE"
    );
    for r in rows {
        out.push_str(&format!(
            "{:<10}  {:<32}  {:<20}  {:<10}  {:>6}  {:>8}\n",
            r.date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            r.run_id,
            r.brand,
            r.row_type.as_str(),
            r.rank.as_deref().unwrap_or("-"),
            fmt_opt(r.total_distance, 2),
        ));
    }
    out
}
