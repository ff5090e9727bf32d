use chrono::NaiveDate;
use geolens_core::normalize::{normalize_response, RunContext};
use geolens_metrics::Dashboard;

fn run(brand: &str, day: u32, body: &str) -> Vec<geolens_core::model::AuditRow> {
    let ctx = RunContext::new(
        brand,
        "Shoes",
        "Running",
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        Some("fake"),
    );
    normalize_response(body, &ctx).unwrap()
}

const OLD_RUN: &str = r#"{
  "market_vectors": {"Price": 50, "Style": 50},
  "vector_definitions": {"Price": {"key_sources": ["old.com"]}},
  "target_brand_analysis": {"rank": 4, "scores": {"Price": 5, "Style": 5}},
  "market_leaders": [{"brand": "Nike", "rank": 1, "scores": {"Price": 9, "Style": 9}}]
}"#;

const NEW_RUN: &str = r#"{
  "market_vectors": {"Price": 40, "Comfort": 60, "Color": 0},
  "vector_definitions": {
    "price": {"type": "Quantitative", "kpi": "USD", "source_logic": "listings",
              "key_sources": [{"domain": "Amazon.com", "score": 9}, {"domain": "rei.com", "score": 1}]},
    "Comfort": {"type": "Qualitative", "kpi": "reviews", "source_logic": "forums",
                "key_sources": ["reddit.com", "amazon.com ", "runnersworld.com"]}
  },
  "target_brand_analysis": {"rank": 2, "scores": {"Price": 8, "Comfort": 6}},
  "market_leaders": [
    {"brand": "Nike", "rank": 1, "scores": {"Price": 7, "Comfort": 9}},
    {"brand": "Hoka", "rank": "unranked", "scores": {"Price": 6, "Comfort": 10}}
  ]
}"#;

#[test]
fn test_dashboard_uses_latest_snapshot_for_vectors_and_all_time_for_gap() {
    let mut rows = run("Acme", 1, OLD_RUN);
    rows.extend(run("Acme", 2, NEW_RUN));

    let dash = Dashboard::build(&rows, "Shoes", "Running", 3);
    assert_eq!(dash.rows_in_view, 5);
    assert_eq!(dash.snapshot_rows, 3);
    assert_eq!(dash.latest_date, NaiveDate::from_ymd_opt(2024, 5, 2));

    // Only the newest run's own target row.
    assert_eq!(dash.targets.len(), 1);
    assert_eq!(dash.targets[0].run_id, "Acme-2024-05-02-fake");
    assert_eq!(dash.targets[0].rank.as_deref(), Some("2"));
    assert_eq!(dash.targets[0].total_distance, Some(4.47));

    // Vectors come from the newest run only; zero weights are dropped.
    let vectors: Vec<_> = dash.vectors.iter().map(|v| v.vector.as_str()).collect();
    assert_eq!(vectors, vec!["Comfort", "Price"]);
    assert_eq!(dash.vectors[1].kpi, "USD");

    // Nike: two mentions at rank 1.
    assert_eq!(dash.leaderboard[0].brand, "Nike");
    assert_eq!(dash.leaderboard[0].visibility_score, Some(2.0));
    // Hoka's rank is not numeric, so it has no visibility and sorts last.
    assert_eq!(dash.leaderboard.last().map(|b| b.brand.as_str()), Some("Hoka"));

    // Acme's gap averages both runs.
    let acme = dash.gap.iter().find(|g| g.brand == "Acme").unwrap();
    assert_eq!(acme.avg_rank, Some(3.0));

    // Amazon is cited under both vectors in different casings.
    let top = &dash.power_top[0];
    assert_eq!(top.domain, "amazon.com");
    assert_eq!(top.citation_count, 2);
    let expected = 36.0 + 60.0 * 0.5 / (1.0 + 0.5 + 1.0 / 3.0);
    assert!((top.power_score - expected).abs() < 1e-9);
    assert!(dash.power_top.len() <= 3);
    assert!(!dash.attribution.power_ranking.iter().any(|p| p.domain == "old.com"));

    let shares: f64 = dash.attribution.breakdown.iter().map(|s| s.impact_share).sum();
    assert!((shares - 100.0).abs() < 1e-9);
}

#[test]
fn test_empty_selection_is_empty_dashboard() {
    let rows = run("Acme", 1, OLD_RUN);
    let dash = Dashboard::build(&rows, "Shoes", "Hiking", 10);
    assert!(dash.is_empty());
    assert!(dash.leaderboard.is_empty());
    assert!(dash.vectors.is_empty());
    assert!(dash.targets.is_empty());
    assert!(dash.attribution.is_empty());
    assert_eq!(dash.latest_date, None);
}

#[test]
fn test_dashboard_serializes() {
    let rows = run("Acme", 2, NEW_RUN);
    let dash = Dashboard::build(&rows, "Shoes", "Running", 10);
    let v = serde_json::to_value(&dash).unwrap();
    assert_eq!(v["category"], "Shoes");
    assert!(v["attribution"]["breakdown"].as_array().is_some_and(|a| a.len() == 5));
    assert_eq!(v["vectors"][1]["type"], "Quantitative");
}
