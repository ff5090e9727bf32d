//! Turns one raw model response into canonical audit rows.
//!
//! The model has answered in several shapes over time:
//!
//! * v1: a flat object of `vector_name: score` plus `Total_Distance`.
//! * v2: `market_vectors`, `vector_definitions`, `target_brand_analysis`
//!   and `market_leaders`, with `key_sources` as bare domains.
//! * v3: as v2, but `key_sources` entries carry a confidence `score`.
//!
//! All of them are resolved here, so nothing downstream branches on shape.

use crate::distance::distance_from_ideal;
use crate::errors::NormalizeError;
use crate::model::{
    citations_from_value, details_from_value, same_name, scores_from_value, weights_from_value,
    AuditRow, CitationMap, DetailMap, RowType, ScoreMap, WeightMap,
};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const MAX_MARKET_LEADERS: usize = 10;

/// Per-response context the model output does not carry itself.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub brand: String,
    pub category: String,
    pub use_case: String,
    pub date: NaiveDate,
    pub run_id: String,
    pub provider: Option<String>,
}

impl RunContext {
    /// `run_id` is `{brand}-{date}` with `-{provider}` appended when known.
    pub fn new(
        brand: &str,
        category: &str,
        use_case: &str,
        date: NaiveDate,
        provider: Option<&str>,
    ) -> Self {
        let mut run_id = format!("{}-{}", brand, date);
        if let Some(p) = provider {
            run_id.push('-');
            run_id.push_str(p);
        }
        Self {
            brand: brand.to_string(),
            category: category.to_string(),
            use_case: use_case.to_string(),
            date,
            run_id,
            provider: provider.map(str::to_string),
        }
    }
}

/// Remove markdown code fences around a JSON payload.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) on the opening line.
        s = match rest.find('\n') {
            Some(i) => &rest[i + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

fn parse_payload(raw: &str) -> Result<Map<String, Value>, NormalizeError> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(NormalizeError::EmptyResponse);
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            // Models sometimes wrap the object in prose; retry on the outermost braces.
            let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
                return Err(e.into());
            };
            if end <= start {
                return Err(e.into());
            }
            serde_json::from_str(&body[start..=end]).map_err(|_| NormalizeError::InvalidJson(e))?
        }
    };

    match value {
        Value::Object(obj) => Ok(obj),
        other => Err(NormalizeError::UnexpectedShape(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Produce the Target row and up to ten Competitor rows for one response.
pub fn normalize_response(raw: &str, ctx: &RunContext) -> Result<Vec<AuditRow>, NormalizeError> {
    let obj = parse_payload(raw)?;

    let structured = ["market_vectors", "vector_definitions", "target_brand_analysis", "market_leaders"]
        .iter()
        .any(|k| obj.contains_key(*k));
    if !structured {
        return normalize_flat(&obj, ctx);
    }

    let weights = obj.get("market_vectors").map(weights_from_value).unwrap_or_default();
    let details = obj
        .get("vector_definitions")
        .map(details_from_value)
        .unwrap_or_default();
    let sources = flatten_sources(obj.get("sources"), &details);

    let run = RunShared {
        ctx,
        weights: &weights,
        details: &details,
        sources: &sources,
    };

    let mut rows = Vec::new();
    match obj.get("target_brand_analysis").and_then(Value::as_object) {
        Some(analysis) => rows.push(run.row(&ctx.brand, RowType::Target, analysis)),
        None => tracing::warn!(
            event = "geolens.normalize.missing_target",
            brand = %ctx.brand,
            run_id = %ctx.run_id,
            "response has no target_brand_analysis; keeping competitors only"
        ),
    }

    if let Some(leaders) = obj.get("market_leaders").and_then(Value::as_array) {
        let target = ctx.brand.trim();
        for leader in leaders.iter().take(MAX_MARKET_LEADERS) {
            let Some(entry) = leader.as_object() else {
                continue;
            };
            let Some(name) = first_str(entry, &["brand", "name", "brand_name"]) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() || same_name(name, target) {
                continue;
            }
            rows.push(run.row(name, RowType::Competitor, entry));
        }
    }

    Ok(rows)
}

struct RunShared<'a> {
    ctx: &'a RunContext,
    weights: &'a WeightMap,
    details: &'a DetailMap,
    sources: &'a [String],
}

impl RunShared<'_> {
    fn row(&self, brand: &str, row_type: RowType, entry: &Map<String, Value>) -> AuditRow {
        let scores = first_value(entry, &["scores", "vector_scores"])
            .map(scores_from_value)
            .unwrap_or_default();
        let citations = first_value(entry, &["citations", "vector_citations", "evidence"])
            .map(citations_from_value)
            .unwrap_or_default();
        let rank = first_value(entry, &["rank", "estimated_rank", "market_rank"]).and_then(rank_text);

        build_row(
            self.ctx,
            brand,
            row_type,
            rank,
            self.weights.clone(),
            self.details.clone(),
            scores,
            citations,
            self.sources.to_vec(),
        )
    }
}

/// v1 shape: every numeric field except the model's own distance is a score.
fn normalize_flat(obj: &Map<String, Value>, ctx: &RunContext) -> Result<Vec<AuditRow>, NormalizeError> {
    let scores: ScoreMap = scores_from_value(&Value::Object(obj.clone()))
        .into_iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("total_distance"))
        .collect();
    if scores.is_empty() {
        return Err(NormalizeError::UnexpectedShape(
            "no market_vectors, analysis or scores found".into(),
        ));
    }
    Ok(vec![build_row(
        ctx,
        &ctx.brand,
        RowType::Target,
        None,
        WeightMap::new(),
        DetailMap::new(),
        scores,
        CitationMap::new(),
        Vec::new(),
    )])
}

#[allow(clippy::too_many_arguments)]
fn build_row(
    ctx: &RunContext,
    brand: &str,
    row_type: RowType,
    rank: Option<String>,
    vector_weights: WeightMap,
    vector_details: DetailMap,
    vector_scores: ScoreMap,
    vector_citations: CitationMap,
    sources: Vec<String>,
) -> AuditRow {
    let total_distance = Some(distance_from_ideal(&vector_scores));
    AuditRow {
        date: Some(ctx.date),
        run_id: ctx.run_id.clone(),
        category: ctx.category.clone(),
        use_case: ctx.use_case.clone(),
        brand: brand.to_string(),
        row_type,
        rank,
        model_provider: ctx.provider.clone(),
        vector_weights,
        vector_details,
        vector_scores,
        vector_citations,
        total_distance,
        sources,
    }
}

/// Legacy top-level `sources` first, then every `key_sources` domain, de-duplicated.
fn flatten_sources(legacy: Option<&Value>, details: &DetailMap) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let legacy = legacy
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    let nested = details
        .values()
        .flat_map(|d| d.key_sources.iter().map(|s| s.domain()));
    for domain in legacy.chain(nested) {
        let d = domain.trim();
        if !d.is_empty() && seen.insert(d.to_lowercase()) {
            out.push(d.to_string());
        }
    }
    out
}

fn rank_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn first_value<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
