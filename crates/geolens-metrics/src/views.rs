use chrono::NaiveDate;
use geolens_core::keyindex::KeyIndex;
use geolens_core::model::{AuditRow, DetailMap, Source, VectorKind, WeightMap};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const LEADERBOARD_SIZE: usize = 10;

/// Rows for one (category, use_case) pair. Nothing is selected until both are.
pub fn filter_rows<'a>(
    rows: &'a [AuditRow],
    category: Option<&str>,
    use_case: Option<&str>,
) -> Vec<&'a AuditRow> {
    let (Some(category), Some(use_case)) = (category, use_case) else {
        return Vec::new();
    };
    rows.iter()
        .filter(|r| r.category == category)
        .filter(|r| r.use_case == use_case)
        .collect()
}

pub fn latest_date(rows: &[&AuditRow]) -> Option<NaiveDate> {
    rows.iter().filter_map(|r| r.date).max()
}

/// Rows sharing the most recent date in `rows`.
pub fn latest_snapshot<'a>(rows: &[&'a AuditRow]) -> Vec<&'a AuditRow> {
    let Some(latest) = latest_date(rows) else {
        return Vec::new();
    };
    rows.iter()
        .copied()
        .filter(|r| r.date == Some(latest))
        .collect()
}

/// Distinct categories with their distinct use cases, sorted.
pub fn selection_index(rows: &[AuditRow]) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for r in rows.iter().filter(|r| !r.category.is_empty()) {
        let use_cases = out.entry(r.category.clone()).or_default();
        if !r.use_case.is_empty() && !use_cases.contains(&r.use_case) {
            use_cases.push(r.use_case.clone());
        }
    }
    for use_cases in out.values_mut() {
        use_cases.sort();
    }
    out
}

/// The Target row of a run. Runs are expected to have exactly one; with
/// several, the first wins and the duplicate is logged.
pub fn target_row<'a>(rows: &[&'a AuditRow], run_id: &str) -> Option<&'a AuditRow> {
    let mut targets = rows
        .iter()
        .copied()
        .filter(|r| r.run_id == run_id && r.is_target());
    let first = targets.next()?;
    let extra = targets.count();
    if extra > 0 {
        tracing::warn!(
            event = "geolens.views.duplicate_target",
            run_id = %run_id,
            extra,
            "run has more than one Target row; using the first"
        );
    }
    Some(first)
}

/// The audited brand's own row in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetStanding {
    pub run_id: String,
    pub brand: String,
    pub model_provider: Option<String>,
    pub rank: Option<String>,
    pub total_distance: Option<f64>,
}

/// One standing per run in `snapshot`, in first-seen run order. Runs whose
/// response had no target analysis are left out.
pub fn target_standings(snapshot: &[&AuditRow]) -> Vec<TargetStanding> {
    let mut seen: HashSet<String> = HashSet::new();
    snapshot
        .iter()
        .filter(|r| seen.insert(r.run_id.clone()))
        .filter_map(|r| target_row(snapshot, &r.run_id))
        .map(|t| TargetStanding {
            run_id: t.run_id.clone(),
            brand: t.brand.clone(),
            model_provider: t.model_provider.clone(),
            rank: t.rank.clone(),
            total_distance: t.total_distance,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandStats {
    pub brand: String,
    pub mentions: usize,
    /// Mean over numeric ranks only.
    pub avg_rank: Option<f64>,
    pub avg_distance: Option<f64>,
    /// `mentions / avg_rank`.
    pub visibility_score: Option<f64>,
}

#[derive(Default)]
struct Accum {
    mentions: usize,
    ranks: Vec<f64>,
    distances: Vec<f64>,
}

fn mean(v: &[f64]) -> Option<f64> {
    (!v.is_empty()).then(|| v.iter().sum::<f64>() / v.len() as f64)
}

/// Per-brand aggregates over all given rows, in first-seen brand order.
pub fn brand_stats(rows: &[&AuditRow]) -> Vec<BrandStats> {
    let mut order: Vec<&str> = Vec::new();
    let mut acc: HashMap<&str, Accum> = HashMap::new();

    for r in rows {
        let a = acc.entry(r.brand.as_str()).or_insert_with(|| {
            order.push(r.brand.as_str());
            Accum::default()
        });
        a.mentions += 1;
        if let Some(rank) = r.rank_value() {
            a.ranks.push(rank);
        }
        if let Some(d) = r.total_distance.filter(|d| d.is_finite()) {
            a.distances.push(d);
        }
    }

    order
        .into_iter()
        .filter_map(|brand| {
            let a = acc.remove(brand)?;
            let avg_rank = mean(&a.ranks);
            let visibility_score = avg_rank
                .filter(|r| *r > 0.0)
                .map(|r| a.mentions as f64 / r);
            Some(BrandStats {
                brand: brand.to_string(),
                mentions: a.mentions,
                avg_rank,
                avg_distance: mean(&a.distances),
                visibility_score,
            })
        })
        .collect()
}

/// `None` sorts after every number.
fn cmp_desc(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

fn cmp_asc(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => cmp_desc(a, b),
    }
}

/// Top brands by visibility score.
pub fn leaderboard(rows: &[&AuditRow]) -> Vec<BrandStats> {
    let mut stats = brand_stats(rows);
    stats.sort_by(|a, b| {
        cmp_desc(a.visibility_score, b.visibility_score)
            .then_with(|| b.mentions.cmp(&a.mentions))
            .then_with(|| a.brand.cmp(&b.brand))
    });
    stats.truncate(LEADERBOARD_SIZE);
    stats
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapEntry {
    pub brand: String,
    pub avg_distance: Option<f64>,
    pub avg_rank: Option<f64>,
}

/// All-time mean distance and rank per brand, closest to ideal first.
pub fn gap_view(rows: &[&AuditRow]) -> Vec<GapEntry> {
    let mut out: Vec<GapEntry> = brand_stats(rows)
        .into_iter()
        .map(|s| GapEntry {
            brand: s.brand,
            avg_distance: s.avg_distance,
            avg_rank: s.avg_rank,
        })
        .collect();
    out.sort_by(|a, b| cmp_asc(a.avg_distance, b.avg_distance).then_with(|| a.brand.cmp(&b.brand)));
    out
}

/// Every brand with mentions, rank, distance and visibility, for a scatter plot.
pub fn landscape(rows: &[&AuditRow]) -> Vec<BrandStats> {
    let mut stats = brand_stats(rows);
    stats.sort_by(|a, b| a.brand.cmp(&b.brand));
    stats
}

/// Weights and details shared by one snapshot, taken from the first row that
/// has each. Rows of one run are assumed to carry identical definitions.
pub fn representative_maps(snapshot: &[&AuditRow]) -> (WeightMap, DetailMap) {
    let weights = snapshot
        .iter()
        .find(|r| !r.vector_weights.is_empty())
        .map(|r| r.vector_weights.clone())
        .unwrap_or_default();
    let details = snapshot
        .iter()
        .find(|r| !r.vector_details.is_empty())
        .map(|r| r.vector_details.clone())
        .unwrap_or_default();
    (weights, details)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorIntel {
    pub vector: String,
    pub weight: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub kpi: String,
    pub source_logic: String,
    pub key_sources: Vec<Source>,
}

/// Decision vectors of the latest snapshot, heaviest first, zero weights dropped.
pub fn vector_intelligence(snapshot: &[&AuditRow]) -> Vec<VectorIntel> {
    let (weights, details) = representative_maps(snapshot);
    let details = KeyIndex::new(&details);

    let mut out: Vec<VectorIntel> = weights
        .iter()
        .filter(|(_, w)| **w != 0.0)
        .map(|(vector, weight)| {
            let detail = details.get(vector);
            VectorIntel {
                vector: vector.clone(),
                weight: *weight,
                kind: detail
                    .map(|d| d.kind)
                    .unwrap_or(VectorKind::Unknown)
                    .as_str()
                    .to_string(),
                kpi: detail.map(|d| d.kpi.clone()).unwrap_or_default(),
                source_logic: detail
                    .map(|d| d.source_logic.clone())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "N/A".to_string()),
                key_sources: detail.map(|d| d.key_sources.clone()).unwrap_or_default(),
            }
        })
        .collect();
    out.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.vector.cmp(&b.vector)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolens_core::model::{RowType, VectorDetail};

    fn row(brand: &str, date: (i32, u32, u32), rank: Option<&str>, distance: Option<f64>) -> AuditRow {
        AuditRow {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            run_id: format!("{brand}-run"),
            category: "Shoes".into(),
            use_case: "Running".into(),
            brand: brand.into(),
            row_type: RowType::Competitor,
            rank: rank.map(str::to_string),
            model_provider: None,
            vector_weights: WeightMap::new(),
            vector_details: DetailMap::new(),
            vector_scores: Default::default(),
            vector_citations: Default::default(),
            total_distance: distance,
            sources: vec![],
        }
    }

    #[test]
    fn test_leaderboard_fixture() {
        let rows = [
            row("A", (2024, 5, 1), Some("1"), None),
            row("A", (2024, 5, 2), Some("2"), None),
            row("A", (2024, 5, 3), Some("3"), None),
            row("B", (2024, 5, 3), Some("5"), None),
        ];
        let refs: Vec<&AuditRow> = rows.iter().collect();
        let board = leaderboard(&refs);
        assert_eq!(board[0].brand, "A");
        assert_eq!(board[0].mentions, 3);
        assert_eq!(board[0].avg_rank, Some(2.0));
        assert_eq!(board[0].visibility_score, Some(1.5));
        assert_eq!(board[1].brand, "B");
        assert_eq!(board[1].visibility_score, Some(0.2));
    }

    #[test]
    fn test_non_numeric_ranks_excluded_from_mean() {
        let rows = [
            row("A", (2024, 5, 1), Some("2"), Some(3.0)),
            row("A", (2024, 5, 1), Some("N/A"), None),
            row("A", (2024, 5, 1), None, Some(5.0)),
        ];
        let refs: Vec<&AuditRow> = rows.iter().collect();
        let stats = brand_stats(&refs);
        assert_eq!(stats[0].mentions, 3);
        assert_eq!(stats[0].avg_rank, Some(2.0));
        assert_eq!(stats[0].avg_distance, Some(4.0));
        assert_eq!(stats[0].visibility_score, Some(1.5));
    }

    #[test]
    fn test_brand_without_ranks_sorts_last() {
        let rows = [
            row("NoRank", (2024, 5, 1), None, None),
            row("Ranked", (2024, 5, 1), Some("4"), None),
        ];
        let refs: Vec<&AuditRow> = rows.iter().collect();
        let board = leaderboard(&refs);
        assert_eq!(board[0].brand, "Ranked");
        assert_eq!(board[1].visibility_score, None);
    }

    #[test]
    fn test_leaderboard_capped() {
        let rows: Vec<AuditRow> = (0..15)
            .map(|i| row(&format!("B{i:02}"), (2024, 5, 1), Some("1"), None))
            .collect();
        let refs: Vec<&AuditRow> = rows.iter().collect();
        assert_eq!(leaderboard(&refs).len(), LEADERBOARD_SIZE);
    }

    #[test]
    fn test_filter_requires_selection() {
        let rows = [row("A", (2024, 5, 1), None, None)];
        assert!(filter_rows(&rows, None, Some("Running")).is_empty());
        assert!(filter_rows(&rows, Some("Shoes"), None).is_empty());
        assert_eq!(filter_rows(&rows, Some("Shoes"), Some("Running")).len(), 1);
        assert!(filter_rows(&rows, Some("Shoes"), Some("Hiking")).is_empty());
    }

    #[test]
    fn test_latest_snapshot() {
        let mut undated = row("C", (2024, 1, 1), None, None);
        undated.date = None;
        let rows = [
            row("A", (2024, 5, 1), None, None),
            row("B", (2024, 5, 3), None, None),
            row("A", (2024, 5, 3), None, None),
            undated,
        ];
        let refs: Vec<&AuditRow> = rows.iter().collect();
        let snap = latest_snapshot(&refs);
        assert_eq!(snap.len(), 2);
        assert!(snap.iter().all(|r| r.date == NaiveDate::from_ymd_opt(2024, 5, 3)));
    }

    #[test]
    fn test_gap_view_all_time() {
        let rows = [
            row("A", (2024, 5, 1), Some("1"), Some(2.0)),
            row("A", (2024, 5, 2), Some("3"), Some(4.0)),
            row("B", (2024, 5, 2), Some("2"), Some(1.0)),
            row("C", (2024, 5, 2), Some("2"), None),
        ];
        let refs: Vec<&AuditRow> = rows.iter().collect();
        let gap = gap_view(&refs);
        let brands: Vec<_> = gap.iter().map(|g| g.brand.as_str()).collect();
        assert_eq!(brands, vec!["B", "A", "C"]);
        assert_eq!(gap[1].avg_distance, Some(3.0));
        assert_eq!(gap[1].avg_rank, Some(2.0));
    }

    #[test]
    fn test_vector_intelligence_joins_case_insensitively() {
        let mut first = row("A", (2024, 5, 1), None, None);
        first.vector_details.insert(
            "price".into(),
            VectorDetail {
                kind: VectorKind::Quantitative,
                kpi: "USD".into(),
                source_logic: "listings".into(),
                key_sources: vec![Source::Domain("amazon.com".into())],
            },
        );
        let mut second = row("B", (2024, 5, 1), None, None);
        second.vector_weights = [
            ("Price".to_string(), 30.0),
            ("Comfort".to_string(), 70.0),
            ("Color".to_string(), 0.0),
        ]
        .into_iter()
        .collect();

        let rows = [first, second];
        let refs: Vec<&AuditRow> = rows.iter().collect();
        let intel = vector_intelligence(&refs);
        assert_eq!(intel.len(), 2);
        assert_eq!(intel[0].vector, "Comfort");
        assert_eq!(intel[0].kind, "Unknown");
        assert_eq!(intel[0].source_logic, "N/A");
        assert_eq!(intel[1].vector, "Price");
        assert_eq!(intel[1].kind, "Quantitative");
        assert_eq!(intel[1].kpi, "USD");
    }

    #[test]
    fn test_target_row_first_match() {
        let mut t1 = row("A", (2024, 5, 1), Some("1"), None);
        t1.row_type = RowType::Target;
        let mut t2 = row("A2", (2024, 5, 1), Some("2"), None);
        t2.row_type = RowType::Target;
        t2.run_id = t1.run_id.clone();
        let comp = row("A", (2024, 5, 1), Some("3"), None);
        let rows = [comp, t1, t2];
        let refs: Vec<&AuditRow> = rows.iter().collect();
        assert_eq!(target_row(&refs, "A-run").map(|r| r.brand.as_str()), Some("A"));
        assert!(target_row(&refs, "missing").is_none());
    }

    #[test]
    fn test_target_standings_one_per_run() {
        let mut t1 = row("Acme", (2024, 5, 1), Some("2"), Some(4.47));
        t1.row_type = RowType::Target;
        t1.run_id = "Acme-2024-05-01-openai".into();
        let mut c1 = row("Nike", (2024, 5, 1), Some("1"), Some(1.0));
        c1.run_id = t1.run_id.clone();
        let mut orphan = row("Hoka", (2024, 5, 1), Some("3"), None);
        orphan.run_id = "Acme-2024-05-01-gemini".into();

        let rows = [c1, t1, orphan];
        let refs: Vec<&AuditRow> = rows.iter().collect();
        let standings = target_standings(&refs);
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].brand, "Acme");
        assert_eq!(standings[0].run_id, "Acme-2024-05-01-openai");
        assert_eq!(standings[0].rank.as_deref(), Some("2"));
        assert_eq!(standings[0].total_distance, Some(4.47));
    }

    #[test]
    fn test_selection_index() {
        let mut other = row("A", (2024, 5, 1), None, None);
        other.use_case = "Hiking".into();
        let rows = [row("A", (2024, 5, 1), None, None), other, row("B", (2024, 5, 1), None, None)];
        let idx = selection_index(&rows);
        assert_eq!(idx["Shoes"], vec!["Hiking", "Running"]);
    }
}
