// ============================================================
// Layer 3 — Corpus Record Types
// ============================================================
// A `Record` is one row of the corpus CSV. After filtering,
// records are paired with their integer label and travel
// through splitting, encoding and reporting as a single
// `LabeledSample`, so code text and label never drift apart.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::error::CorpusError;
use crate::domain::label_map::LabelMap;

/// One raw corpus row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The source code snippet
    pub code: String,

    /// Identifier of the snippet's author (the classification target)
    pub author: String,

    /// Number of newlines in the snippet, as recorded in the corpus
    pub newline_count: i64,
}

impl Record {
    pub fn new(code: impl Into<String>, author: impl Into<String>, newline_count: i64) -> Self {
        Self {
            code:   code.into(),
            author: author.into(),
            newline_count,
        }
    }
}

/// A code snippet paired with its author and dense label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub code:   String,
    pub author: String,
    pub label:  usize,
}

/// The records that survived filtering, plus the retained authors
/// in order of first appearance in the corpus.
#[derive(Debug, Clone, Default)]
pub struct FilteredCorpus {
    pub records: Vec<Record>,
    pub authors: Vec<String>,
}

impl FilteredCorpus {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    /// Number of records per retained author, in author order.
    pub fn support(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for r in &self.records {
            *counts.entry(r.author.as_str()).or_insert(0) += 1;
        }
        self.authors
            .iter()
            .map(|a| (a.clone(), counts.get(a.as_str()).copied().unwrap_or(0)))
            .collect()
    }

    /// Attach labels from `labels` to every record.
    /// Fails if a record's author is not in the map.
    pub fn into_labeled(self, labels: &LabelMap) -> Result<Vec<LabeledSample>, CorpusError> {
        self.records
            .into_iter()
            .map(|r| {
                let label = labels
                    .label_of(&r.author)
                    .ok_or_else(|| CorpusError::UnmappedAuthor(r.author.clone()))?;
                Ok(LabeledSample { code: r.code, author: r.author, label })
            })
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> FilteredCorpus {
        FilteredCorpus {
            records: vec![
                Record::new("a1", "alice", 3),
                Record::new("b1", "bob", 4),
                Record::new("a2", "alice", 5),
            ],
            authors: vec!["alice".into(), "bob".into()],
        }
    }

    #[test]
    fn test_support_follows_author_order() {
        let support = corpus().support();
        assert_eq!(support, vec![("alice".to_string(), 2), ("bob".to_string(), 1)]);
    }

    #[test]
    fn test_into_labeled_keeps_text_and_label_together() {
        let c      = corpus();
        let labels = LabelMap::from_authors(&c.authors);
        let samples = c.into_labeled(&labels).unwrap();

        assert_eq!(samples.len(), 3);
        for s in &samples {
            assert_eq!(labels.author_of(s.label), Some(s.author.as_str()));
        }
        assert_eq!(samples[1].code, "b1");
    }

    #[test]
    fn test_into_labeled_rejects_unknown_author() {
        let c      = corpus();
        let labels = LabelMap::from_authors(&["alice".to_string()]);
        let err    = c.into_labeled(&labels).unwrap_err();
        assert!(matches!(err, CorpusError::UnmappedAuthor(a) if a == "bob"));
    }
}
