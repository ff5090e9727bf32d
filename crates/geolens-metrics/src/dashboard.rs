use crate::attribution::{attribute, Attribution, DomainPower};
use crate::views::{
    filter_rows, gap_view, landscape, latest_date, latest_snapshot, leaderboard,
    representative_maps, target_standings, vector_intelligence, BrandStats, GapEntry, TargetStanding,
    VectorIntel,
};
use chrono::NaiveDate;
use geolens_core::model::AuditRow;
use serde::Serialize;

pub const DEFAULT_POWER_TOP_N: usize = 10;

/// Every derived view for one (category, use_case) selection.
///
/// Rebuilt on every selection; the attribution in particular always reflects
/// the latest snapshot of the rows currently in view.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub category: String,
    pub use_case: String,
    pub rows_in_view: usize,
    pub latest_date: Option<NaiveDate>,
    pub snapshot_rows: usize,
    pub targets: Vec<TargetStanding>,
    pub leaderboard: Vec<BrandStats>,
    pub gap: Vec<GapEntry>,
    pub landscape: Vec<BrandStats>,
    pub vectors: Vec<VectorIntel>,
    pub power_top: Vec<DomainPower>,
    pub attribution: Attribution,
}

impl Dashboard {
    pub fn build(rows: &[AuditRow], category: &str, use_case: &str, top_n: usize) -> Self {
        let filtered = filter_rows(rows, Some(category), Some(use_case));
        let snapshot = latest_snapshot(&filtered);
        let (weights, details) = representative_maps(&snapshot);
        let attribution = attribute(&weights, &details);

        tracing::debug!(
            event = "geolens.dashboard.built",
            category = %category,
            use_case = %use_case,
            rows = filtered.len(),
            snapshot = snapshot.len(),
        );

        Self {
            category: category.to_string(),
            use_case: use_case.to_string(),
            rows_in_view: filtered.len(),
            latest_date: latest_date(&filtered),
            snapshot_rows: snapshot.len(),
            targets: target_standings(&snapshot),
            leaderboard: leaderboard(&filtered),
            gap: gap_view(&filtered),
            landscape: landscape(&filtered),
            vectors: vector_intelligence(&snapshot),
            power_top: attribution.top(top_n).into_iter().cloned().collect(),
            attribution,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows_in_view == 0
    }
}
