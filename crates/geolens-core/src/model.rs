use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Vector name -> importance weight (conventionally summing to ~100).
pub type WeightMap = BTreeMap<String, f64>;
/// Vector name -> 0..10 score for one brand.
pub type ScoreMap = BTreeMap<String, f64>;
/// Vector name -> evidence reference (URL or free text).
pub type CitationMap = BTreeMap<String, String>;
/// Vector name -> definition metadata.
pub type DetailMap = BTreeMap<String, VectorDetail>;

pub const UNKNOWN_DOMAIN: &str = "Unknown";
pub const DEFAULT_SOURCE_SCORE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowType {
    Target,
    Competitor,
}

impl RowType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "target" => Some(RowType::Target),
            "competitor" => Some(RowType::Competitor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RowType::Target => "Target",
            RowType::Competitor => "Competitor",
        }
    }
}

/// One brand's evaluation in one audit run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRow {
    pub date: Option<NaiveDate>,
    pub run_id: String,
    pub category: String,
    pub use_case: String,
    pub brand: String,
    #[serde(rename = "type")]
    pub row_type: RowType,
    /// Raw rank as reported by the model; may be non-numeric.
    pub rank: Option<String>,
    pub model_provider: Option<String>,
    pub vector_weights: WeightMap,
    pub vector_details: DetailMap,
    pub vector_scores: ScoreMap,
    pub vector_citations: CitationMap,
    pub total_distance: Option<f64>,
    /// Legacy flattened domain list, superseded by `key_sources`.
    pub sources: Vec<String>,
}

impl AuditRow {
    /// Numeric rank, or `None` when missing or not a number.
    pub fn rank_value(&self) -> Option<f64> {
        self.rank.as_deref().and_then(parse_number)
    }

    pub fn is_target(&self) -> bool {
        self.row_type == RowType::Target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VectorKind {
    Quantitative,
    Qualitative,
    #[default]
    Unknown,
}

impl VectorKind {
    pub fn parse(s: &str) -> Self {
        let s = s.trim().to_ascii_lowercase();
        if s.starts_with("quant") {
            VectorKind::Quantitative
        } else if s.starts_with("qual") {
            VectorKind::Qualitative
        } else {
            VectorKind::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VectorKind::Quantitative => "Quantitative",
            VectorKind::Qualitative => "Qualitative",
            VectorKind::Unknown => "Unknown",
        }
    }
}

impl Serialize for VectorKind {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VectorDetail {
    #[serde(rename = "type")]
    pub kind: VectorKind,
    pub kpi: String,
    pub source_logic: String,
    pub key_sources: Vec<Source>,
}

impl VectorDetail {
    /// Lenient decode: any missing or mistyped field falls back to its default.
    pub fn from_value(v: &Value) -> Self {
        let Some(obj) = v.as_object() else {
            return Self::default();
        };
        let text = |k: &str| obj.get(k).and_then(Value::as_str).unwrap_or_default().to_string();

        let key_sources = obj
            .get("key_sources")
            .or_else(|| obj.get("sources"))
            .and_then(Value::as_array)
            .map(|arr| arr.iter().map(Source::from_value).collect())
            .unwrap_or_default();

        Self {
            kind: obj
                .get("type")
                .and_then(Value::as_str)
                .map(VectorKind::parse)
                .unwrap_or_default(),
            kpi: text("kpi"),
            source_logic: text("source_logic"),
            key_sources,
        }
    }
}

/// A cited source for one vector.
///
/// Older runs list bare domains; newer runs attach a confidence score.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Domain(String),
    Scored { domain: String, score: f64 },
}

impl Source {
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::String(s) => Source::Domain(s.clone()),
            Value::Object(obj) => {
                let domain = ["domain", "url", "name", "source"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(Value::as_str))
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(UNKNOWN_DOMAIN)
                    .to_string();
                let score = ["score", "confidence"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(value_as_f64))
                    .unwrap_or(DEFAULT_SOURCE_SCORE);
                Source::Scored { domain, score }
            }
            _ => Source::Domain(UNKNOWN_DOMAIN.to_string()),
        }
    }

    pub fn domain(&self) -> &str {
        match self {
            Source::Domain(d) => d,
            Source::Scored { domain, .. } => domain,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Source::Domain(_) => None,
            Source::Scored { score, .. } => Some(*score),
        }
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Source::Domain(d) => s.serialize_str(d),
            Source::Scored { domain, score } => {
                serde_json::json!({ "domain": domain, "score": score }).serialize(s)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(Source::from_value(&v))
    }
}

/// One tracked audit target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTarget {
    pub brand: String,
    pub category: String,
    pub use_case: String,
}

impl TrackedTarget {
    pub fn new(
        brand: impl Into<String>,
        category: impl Into<String>,
        use_case: impl Into<String>,
    ) -> Self {
        Self {
            brand: brand.into(),
            category: category.into(),
            use_case: use_case.into(),
        }
    }

    pub fn same_as(&self, other: &TrackedTarget) -> bool {
        same_name(&self.brand, &other.brand)
            && same_name(&self.category, &other.category)
            && same_name(&self.use_case, &other.use_case)
    }
}

/// Trimmed, Unicode case-insensitive name equality ("Nestlé" == "NESTLÉ ").
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub meta: Value,
}

/// Numbers arrive as JSON numbers, numeric strings, or percentages ("30%").
pub fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim().trim_end_matches('%').trim();
    t.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn weights_from_value(v: &Value) -> WeightMap {
    numeric_map(v)
}

pub fn scores_from_value(v: &Value) -> ScoreMap {
    numeric_map(v)
}

fn numeric_map(v: &Value) -> BTreeMap<String, f64> {
    v.as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| value_as_f64(v).map(|n| (k.clone(), n)))
                .collect()
        })
        .unwrap_or_default()
}

pub fn details_from_value(v: &Value) -> DetailMap {
    v.as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), VectorDetail::from_value(v)))
                .collect()
        })
        .unwrap_or_default()
}

pub fn citations_from_value(v: &Value) -> CitationMap {
    v.as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| match v {
                    Value::Null => None,
                    Value::String(s) => Some((k.clone(), s.clone())),
                    other => Some((k.clone(), other.to_string())),
                })
                .collect()
        })
        .unwrap_or_default()
}
