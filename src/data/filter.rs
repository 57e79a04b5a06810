// ============================================================
// Layer 4 — Corpus Filter
// ============================================================
// Two passes over the raw records:
//
//   1. keep rows with newline_count > min_newlines
//   2. count rows per author on what survived pass 1,
//      keep rows whose author count > min_author_support
//
// Retained authors are listed in order of first appearance.
// An empty result is an error, never an empty dataset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::error::CorpusError;
use crate::domain::record::{FilteredCorpus, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusFilter {
    /// Rows need strictly more newlines than this
    pub min_newlines: i64,
    /// Authors need strictly more surviving rows than this
    pub min_author_support: usize,
}

impl Default for CorpusFilter {
    fn default() -> Self {
        Self { min_newlines: 2, min_author_support: 10 }
    }
}

impl CorpusFilter {
    pub fn apply(&self, records: Vec<Record>) -> Result<FilteredCorpus, CorpusError> {
        let total = records.len();

        let formatted: Vec<Record> = records
            .into_iter()
            .filter(|r| r.newline_count > self.min_newlines)
            .collect();
        let kept = formatted.len();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order:  Vec<&str>            = Vec::new();
        for r in &formatted {
            let c = counts.entry(r.author.as_str()).or_insert(0);
            if *c == 0 {
                order.push(r.author.as_str());
            }
            *c += 1;
        }

        let authors: Vec<String> = order
            .into_iter()
            .filter(|a| counts[a] > self.min_author_support)
            .map(str::to_string)
            .collect();

        if authors.is_empty() {
            return Err(CorpusError::NoAuthorsSurvived { rows: total, kept });
        }

        let retained: std::collections::HashSet<&str> =
            authors.iter().map(String::as_str).collect();
        let records: Vec<Record> = formatted
            .iter()
            .filter(|r| retained.contains(r.author.as_str()))
            .cloned()
            .collect();

        tracing::info!(
            "Filter kept {} of {} rows ({} after newline filter), {} authors",
            records.len(),
            total,
            kept,
            authors.len()
        );

        Ok(FilteredCorpus { records, authors })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn rows(author: &str, n: usize, newlines: i64) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(format!("{author} snippet {i}"), author, newlines))
            .collect()
    }

    #[test]
    fn test_toy_corpus_keeps_two_of_three_authors() {
        let mut records = rows("a", 15, 3);
        records.extend(rows("b", 12, 3));
        records.extend(rows("c", 5, 3));

        let corpus = CorpusFilter::default().apply(records).unwrap();
        assert_eq!(corpus.author_count(), 2);
        assert_eq!(corpus.authors, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(corpus.len(), 27);
    }

    #[test]
    fn test_newline_boundary() {
        // 11 rows with 3 newlines for "x" plus one 2-newline row
        let mut records = rows("x", 11, 3);
        records.push(Record::new("short", "x", 2));

        let corpus = CorpusFilter::default().apply(records).unwrap();
        assert_eq!(corpus.len(), 11);
        assert!(corpus.records.iter().all(|r| r.code != "short"));
    }

    #[test]
    fn test_exactly_eleven_samples_included_ten_excluded() {
        let mut records = rows("eleven", 11, 3);
        records.extend(rows("ten", 10, 3));

        let corpus = CorpusFilter::default().apply(records).unwrap();
        assert_eq!(corpus.authors, vec!["eleven".to_string()]);
    }

    #[test]
    fn test_support_counted_after_newline_filter() {
        // 12 rows, but only 10 pass the newline filter
        let mut records = rows("y", 10, 3);
        records.extend(rows("y", 2, 1));
        records.extend(rows("z", 11, 5));

        let corpus = CorpusFilter::default().apply(records).unwrap();
        assert_eq!(corpus.authors, vec!["z".to_string()]);
    }

    #[test]
    fn test_filtered_invariants_hold() {
        let mut records = rows("p", 14, 4);
        records.extend(rows("q", 20, 1));
        records.extend(rows("q", 11, 6));
        records.extend(rows("r", 3, 9));

        let corpus  = CorpusFilter::default().apply(records).unwrap();
        let support = corpus.support();
        assert!(corpus.records.iter().all(|r| r.newline_count > 2));
        assert!(support.iter().all(|(_, n)| *n > 10));
    }

    #[test]
    fn test_no_survivors_is_error() {
        let records = rows("lonely", 4, 3);
        let err = CorpusFilter::default().apply(records).unwrap_err();
        assert!(matches!(err, CorpusError::NoAuthorsSurvived { rows: 4, kept: 4 }));
    }
}
