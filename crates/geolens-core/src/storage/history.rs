//! Append-only audit history kept as one CSV blob.
//!
//! Rows written by different releases coexist in the file. Reading keeps the
//! union of all columns, and any cell a row lacks decodes as empty.

use super::blob::BlobStore;
use crate::model::{
    citations_from_value, details_from_value, parse_number, scores_from_value, weights_from_value,
    AuditRow, RowType,
};
use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_HISTORY_PATH: &str = "history.csv";

pub const CANONICAL_COLUMNS: [&str; 14] = [
    "date",
    "run_id",
    "category",
    "use_case",
    "brand",
    "type",
    "rank",
    "model_provider",
    "vector_weights",
    "vector_details",
    "vector_scores",
    "vector_citations",
    "total_distance",
    "sources",
];

pub type Record = HashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct HistoryTable {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl HistoryTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_csv(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);

        // Byte records: one cell saved in a legacy encoding must not hide the rest.
        let headers: Vec<String> = reader
            .byte_headers()
            .context("failed to read history header")?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_string())
            .collect();

        let mut table = Self::empty();
        for h in headers.iter().filter(|h| !h.is_empty()) {
            table.add_column(h);
        }

        let mut lossy_cells = 0usize;
        for (line, result) in reader.byte_records().enumerate() {
            let record = result.with_context(|| format!("malformed history row {}", line + 1))?;
            let mut cells = Record::new();
            for (name, value) in headers.iter().zip(record.iter()) {
                if name.is_empty() || value.is_empty() {
                    continue;
                }
                let text = match std::str::from_utf8(value) {
                    Ok(s) => s.to_string(),
                    Err(_) => {
                        lossy_cells += 1;
                        String::from_utf8_lossy(value).into_owned()
                    }
                };
                cells.insert(name.clone(), text);
            }
            table.records.push(cells);
        }
        if lossy_cells > 0 {
            tracing::warn!(
                event = "geolens.history.invalid_utf8",
                cells = lossy_cells,
                "history has cells that are not UTF-8; invalid bytes replaced"
            );
        }
        Ok(table)
    }

    pub fn to_csv(&self) -> anyhow::Result<Vec<u8>> {
        if self.columns.is_empty() {
            return Ok(Vec::new());
        }
        let columns = self.ordered_columns();
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&columns)?;
        for record in &self.records {
            writer.write_record(
                columns
                    .iter()
                    .map(|c| record.get(*c).map(String::as_str).unwrap_or("")),
            )?;
        }
        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush history csv: {}", e.error()))
    }

    /// Canonical columns first, then legacy extras in first-seen order.
    fn ordered_columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = CANONICAL_COLUMNS
            .iter()
            .copied()
            .filter(|c| self.columns.iter().any(|have| have == c))
            .collect();
        out.extend(
            self.columns
                .iter()
                .map(String::as_str)
                .filter(|c| !CANONICAL_COLUMNS.contains(c)),
        );
        out
    }

    fn add_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn extend_rows(&mut self, rows: &[AuditRow]) {
        if rows.is_empty() {
            return;
        }
        for c in CANONICAL_COLUMNS {
            self.add_column(c);
        }
        self.records.extend(rows.iter().map(row_to_record));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Typed view over every row, tolerant of any schema version.
    pub fn rows(&self) -> Vec<AuditRow> {
        self.records.iter().map(record_to_row).collect()
    }
}

pub fn row_to_record(row: &AuditRow) -> Record {
    let mut r = Record::new();
    let mut put = |k: &str, v: String| {
        if !v.is_empty() {
            r.insert(k.to_string(), v);
        }
    };

    put("date", row.date.map(|d| d.to_string()).unwrap_or_default());
    put("run_id", row.run_id.clone());
    put("category", row.category.clone());
    put("use_case", row.use_case.clone());
    put("brand", row.brand.clone());
    put("type", row.row_type.as_str().to_string());
    put("rank", row.rank.clone().unwrap_or_default());
    put("model_provider", row.model_provider.clone().unwrap_or_default());
    put("vector_weights", json_cell(&row.vector_weights));
    put("vector_details", json_cell(&row.vector_details));
    put("vector_scores", json_cell(&row.vector_scores));
    put("vector_citations", json_cell(&row.vector_citations));
    put(
        "total_distance",
        row.total_distance.map(|d| d.to_string()).unwrap_or_default(),
    );
    if !row.sources.is_empty() {
        put("sources", json_cell(&row.sources));
    }
    r
}

/// Empty maps stay empty cells so "has weights" checks see a blank.
fn json_cell<T: Serialize>(v: &T) -> String {
    match serde_json::to_value(v) {
        Ok(Value::Object(m)) if m.is_empty() => String::new(),
        Ok(Value::Array(a)) if a.is_empty() => String::new(),
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

pub fn record_to_row(r: &Record) -> AuditRow {
    let cell = |k: &str| r.get(k).map(|s| s.trim()).filter(|s| !s.is_empty());
    let text = |k: &str| cell(k).unwrap_or_default().to_string();

    let date = cell("date").and_then(parse_date);
    let brand = text("brand");
    let model_provider = cell("model_provider").map(str::to_string);

    let run_id = cell("run_id").map(str::to_string).unwrap_or_else(|| {
        // Rows from before run ids existed group by brand, date and provider.
        let mut id = format!(
            "{}-{}",
            brand,
            date.map(|d| d.to_string()).unwrap_or_default()
        );
        if let Some(p) = &model_provider {
            id.push('-');
            id.push_str(p);
        }
        id
    });

    AuditRow {
        date,
        run_id,
        category: text("category"),
        use_case: text("use_case"),
        brand,
        // Rows without a type column predate competitor tracking.
        row_type: cell("type")
            .and_then(RowType::parse)
            .unwrap_or(RowType::Target),
        rank: cell("rank").map(str::to_string),
        model_provider,
        vector_weights: json_map(cell("vector_weights"), weights_from_value),
        vector_details: json_map(cell("vector_details"), details_from_value),
        vector_scores: json_map(cell("vector_scores"), scores_from_value),
        vector_citations: json_map(cell("vector_citations"), citations_from_value),
        total_distance: cell("total_distance").and_then(parse_number),
        sources: cell("sources").map(parse_sources).unwrap_or_default(),
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn json_map<T: Default>(cell: Option<&str>, decode: fn(&Value) -> T) -> T {
    match cell.map(serde_json::from_str::<Value>) {
        Some(Ok(v)) => decode(&v),
        Some(Err(e)) => {
            tracing::debug!(event = "geolens.history.bad_cell", error = %e);
            T::default()
        }
        None => T::default(),
    }
}

fn parse_sources(s: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<Value>>(s) {
        Ok(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(d) => Some(d.clone()),
                Value::Object(o) => o.get("domain").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        Err(_) => s
            .split([',', ';'])
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Read-modify-write over one CSV blob.
///
/// There is no locking: two audit runs appending at the same time race, and
/// the later write wins.
#[derive(Clone)]
pub struct HistoryStore {
    blobs: Arc<dyn BlobStore>,
    path: String,
}

impl HistoryStore {
    pub fn new(blobs: Arc<dyn BlobStore>, path: impl Into<String>) -> Self {
        Self {
            blobs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full history, or an empty table if it is missing or unreadable.
    pub async fn read(&self) -> HistoryTable {
        match self.try_read().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(
                    event = "geolens.history.read_failed",
                    path = %self.path,
                    backend = self.blobs.backend_name(),
                    error = %format!("{e:#}"),
                    "history unavailable; using an empty table"
                );
                HistoryTable::empty()
            }
        }
    }

    /// Like `read`, but transport and decode failures are errors. A missing
    /// file is still an empty table.
    pub async fn try_read(&self) -> anyhow::Result<HistoryTable> {
        match self.blobs.read(&self.path).await? {
            Some(bytes) => HistoryTable::from_csv(&bytes),
            None => Ok(HistoryTable::empty()),
        }
    }

    /// Concatenate `rows` onto the stored table. No de-duplication.
    pub async fn append(&self, rows: &[AuditRow]) -> anyhow::Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut table = self
            .try_read()
            .await
            .context("refusing to append: existing history could not be read")?;
        table.extend_rows(rows);
        let bytes = table.to_csv()?;
        self.blobs
            .write(&self.path, &bytes, "📈 Daily Data Update")
            .await?;
        tracing::info!(
            event = "geolens.history.appended",
            path = %self.path,
            rows = rows.len(),
            total = table.len(),
        );
        Ok(rows.len())
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        let bytes = HistoryTable::empty().to_csv()?;
        self.blobs.write(&self.path, &bytes, "Reset history").await?;
        tracing::info!(event = "geolens.history.cleared", path = %self.path);
        Ok(())
    }
}
