// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the corpus CSV using the csv crate.
//
// The file must have a header row. Only three columns matter:
//   - the code text column      (default "code")
//   - the author id column      (default "user_id")
//   - the newline count column  (default "newline_count")
// Any other columns are ignored. Columns are located by name,
// so their order in the file does not matter.
//
// A missing column is a schema error and aborts the run before
// any rows are read.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::error::CorpusError;
use crate::domain::record::Record;
use crate::domain::traits::CorpusSource;

/// Names of the columns the loader needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSchema {
    pub code_column:    String,
    pub author_column:  String,
    pub newline_column: String,
}

impl Default for CorpusSchema {
    fn default() -> Self {
        Self {
            code_column:    "code".to_string(),
            author_column:  "user_id".to_string(),
            newline_column: "newline_count".to_string(),
        }
    }
}

/// Loads `Record`s from a CSV file.
pub struct CsvCorpusLoader {
    path:   PathBuf,
    schema: CorpusSchema,
}

impl CsvCorpusLoader {
    pub fn new(path: impl Into<PathBuf>, schema: CorpusSchema) -> Self {
        Self { path: path.into(), schema }
    }
}

impl CorpusSource for CsvCorpusLoader {
    fn load_all(&self) -> Result<Vec<Record>> {
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("Cannot open corpus '{}'", self.path.display()))?;

        let records = read_records(file, &self.schema)
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))?;

        tracing::info!("Loaded {} rows from '{}'", records.len(), self.path.display());
        Ok(records)
    }
}

/// Parse CSV rows from any reader.
pub fn read_records<R: std::io::Read>(
    reader: R,
    schema: &CorpusSchema,
) -> Result<Vec<Record>, CorpusError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| -> Result<usize, CorpusError> {
        headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
            CorpusError::MissingColumn {
                column: name.to_string(),
                found:  headers.iter().collect::<Vec<_>>().join(", "),
            }
        })
    };

    let code_idx    = column(&schema.code_column)?;
    let author_idx  = column(&schema.author_column)?;
    let newline_idx = column(&schema.newline_column)?;

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row    = row?;
        let row_no = i + 1;

        let raw_count = row.get(newline_idx).unwrap_or("").trim();
        let newline_count = parse_count(raw_count).ok_or_else(|| CorpusError::InvalidField {
            row:    row_no,
            column: schema.newline_column.clone(),
            value:  raw_count.to_string(),
        })?;

        records.push(Record {
            code:   row.get(code_idx).unwrap_or("").to_string(),
            author: row.get(author_idx).unwrap_or("").trim().to_string(),
            newline_count,
        });
    }

    Ok(records)
}

/// Newline counts are integers, but dataframe exports often
/// write them as floats ("12.0").
fn parse_count(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}
