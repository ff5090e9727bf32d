use super::{exit_codes, fmt_opt, AppContext};
use crate::cli::args::DashboardArgs;
use geolens_metrics::views::selection_index;
use geolens_metrics::Dashboard;
use std::collections::BTreeMap;

const NO_DATA: &str = "  no data available\n";

pub async fn run(args: DashboardArgs, ctx: &AppContext) -> anyhow::Result<i32> {
    let rows = ctx.history().read().await.rows();
    let json = args.format == "json";

    let (Some(category), Some(use_case)) = (args.category.as_deref(), args.use_case.as_deref())
    else {
        let index = selection_index(&rows);
        if json {
            println!("{}", serde_json::to_string_pretty(&index)?);
        } else {
            print!("{}", render_index(&index));
        }
        return Ok(exit_codes::OK);
    };

    let dash = Dashboard::build(&rows, category, use_case, args.top);
    if json {
        println!("{}", serde_json::to_string_pretty(&dash)?);
    } else {
        print!("{}", render_text(&dash));
    }
    Ok(exit_codes::OK)
}

fn render_index(index: &BTreeMap<String, Vec<String>>) -> String {
    if index.is_empty() {
        return format!("Available selections\n{NO_DATA}");
    }
    let mut out = String::from("Available selections (pass --category and --use-case)\n");
    for (category, use_cases) in index {
        out.push_str(&format!("  {category}\n"));
        for uc in use_cases {
            out.push_str(&format!("    - {uc}\n"));
        }
    }
    out
}

fn section(out: &mut String, title: &str) {
    out.push_str(&format!("\n== {title} ==\n"));
}

fn render_text(d: &Dashboard) -> String {
    let mut out = format!("GeoLens: {} / {}\n", d.category, d.use_case);
    match d.latest_date {
        Some(date) => out.push_str(&format!(
            "{} rows, latest snapshot {} ({} rows)\n",
            d.rows_in_view, date, d.snapshot_rows
        )),
        None => out.push_str(NO_DATA),
    }

    section(&mut out, "Audited brand (latest snapshot)");
    if d.targets.is_empty() {
        out.push_str(NO_DATA);
    } else {
        out.push_str(&format!(
            "{:<24} {:<12} {:>8} {:>10}\n",
            "BRAND", "PROVIDER", "RANK", "DISTANCE"
        ));
        for t in &d.targets {
            out.push_str(&format!(
                "{:<24} {:<12} {:>8} {:>10}\n",
                t.brand,
                t.model_provider.as_deref().unwrap_or("-"),
                t.rank.as_deref().unwrap_or("-"),
                fmt_opt(t.total_distance, 2),
            ));
        }
    }

    section(&mut out, "Leaderboard");
    if d.leaderboard.is_empty() {
        out.push_str(NO_DATA);
    } else {
        out.push_str(&format!(
            "{:>3}  {:<24} {:>8} {:>8} {:>10}\n",
            "#", "BRAND", "MENTIONS", "AVG RANK", "VISIBILITY"
        ));
        for (i, b) in d.leaderboard.iter().enumerate() {
            out.push_str(&format!(
                "{:>3}  {:<24} {:>8} {:>8} {:>10}\n",
                i + 1,
                b.brand,
                b.mentions,
                fmt_opt(b.avg_rank, 1),
                fmt_opt(b.visibility_score, 2),
            ));
        }
    }

    section(&mut out, "Gap to ideal (all time)");
    if d.gap.is_empty() {
        out.push_str(NO_DATA);
    } else {
        out.push_str(&format!("{:<24} {:>10} {:>8}\n", "BRAND", "DISTANCE", "AVG RANK"));
        for g in &d.gap {
            out.push_str(&format!(
                "{:<24} {:>10} {:>8}\n",
                g.brand,
                fmt_opt(g.avg_distance, 2),
                fmt_opt(g.avg_rank, 1),
            ));
        }
    }

    section(&mut out, "Strategic landscape");
    if d.landscape.is_empty() {
        out.push_str(NO_DATA);
    } else {
        out.push_str(&format!(
            "{:<24} {:>8} {:>8} {:>10} {:>10}\n",
            "BRAND", "MENTIONS", "AVG RANK", "DISTANCE", "VISIBILITY"
        ));
        for b in &d.landscape {
            out.push_str(&format!(
                "{:<24} {:>8} {:>8} {:>10} {:>10}\n",
                b.brand,
                b.mentions,
                fmt_opt(b.avg_rank, 1),
                fmt_opt(b.avg_distance, 2),
                fmt_opt(b.visibility_score, 2),
            ));
        }
    }

    section(&mut out, "Vector intelligence");
    if d.vectors.is_empty() {
        out.push_str(NO_DATA);
    } else {
        for v in &d.vectors {
            out.push_str(&format!("{:<24} {:>6.1}  {}\n", v.vector, v.weight, v.kind));
            if !v.kpi.is_empty() {
                out.push_str(&format!("    KPI:     {}\n", v.kpi));
            }
            out.push_str(&format!("    Logic:   {}\n", v.source_logic));
            if !v.key_sources.is_empty() {
                let sources: Vec<String> = v
                    .key_sources
                    .iter()
                    .map(|s| match s.score() {
                        Some(score) => format!("{} ({score})", s.domain()),
                        None => s.domain().to_string(),
                    })
                    .collect();
                out.push_str(&format!("    Sources: {}\n", sources.join(", ")));
            }
        }
    }

    section(&mut out, "Source power ranking");
    if d.power_top.is_empty() {
        out.push_str(NO_DATA);
    } else {
        out.push_str(&format!("{:<32} {:>8} {:>9}\n", "DOMAIN", "POWER", "CITATIONS"));
        for p in &d.power_top {
            out.push_str(&format!(
                "{:<32} {:>8.2} {:>9}\n",
                p.domain, p.power_score, p.citation_count
            ));
        }
    }

    section(&mut out, "Attribution breakdown");
    if d.attribution.breakdown.is_empty() {
        out.push_str(NO_DATA);
    } else {
        out.push_str(&format!("{:<24} {:<32} {:>8}\n", "VECTOR", "SOURCE", "IMPACT"));
        for s in &d.attribution.breakdown {
            out.push_str(&format!(
                "{:<24} {:<32} {:>8.2}\n",
                s.vector, s.source, s.impact_share
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use geolens_core::normalize::{normalize_response, RunContext};

    #[test]
    fn test_empty_dashboard_shows_placeholders() {
        let d = Dashboard::build(&[], "Shoes", "Running", 10);
        let text = render_text(&d);
        // header plus seven views
        assert_eq!(text.matches("no data available").count(), 8);
    }

    #[test]
    fn test_dashboard_sections() {
        let ctx = RunContext::new(
            "Acme",
            "Shoes",
            "Running",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            Some("openai"),
        );
        let rows = normalize_response(
            r#"{"market_vectors": {"Price": 100},
                "vector_definitions": {"Price": {"type": "Quantitative", "kpi": "USD",
                    "key_sources": [{"domain": "amazon.com", "score": 9}]}},
                "target_brand_analysis": {"rank": 2, "scores": {"Price": 8}},
                "market_leaders": [{"brand": "Nike", "rank": 1, "scores": {"Price": 9}}]}"#,
            &ctx,
        )
        .unwrap();
        let d = Dashboard::build(&rows, "Shoes", "Running", 10);
        let text = render_text(&d);
        assert!(!text.contains("no data available"));
        assert!(text.contains("latest snapshot 2024-05-01 (2 rows)"));
        assert!(text.contains("amazon.com (9)"));
        assert!(text.contains("Acme                     openai"));
        assert!(text.contains("100.00"));
    }

    #[test]
    fn test_index_placeholder() {
        assert!(render_index(&BTreeMap::new()).contains("no data available"));
        let mut idx = BTreeMap::new();
        idx.insert("Shoes".to_string(), vec!["Running".to_string()]);
        let text = render_index(&idx);
        assert!(text.contains("  Shoes\n    - Running\n"));
    }
}
