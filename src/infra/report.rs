// ============================================================
// Layer 6 — Evaluation Report
// ============================================================
// Turns raw logits on the test split into:
//   - accuracy and weighted F1 for the console
//   - a JSON array of misclassified samples:
//
//   [
//     {
//       "true_author": "u17",
//       "predicted_author": "u4",
//       "code": "def f(x):\n    return x"
//     }
//   ]
//
// True authors come from the evaluated samples themselves,
// so entries always line up with the predictions they describe.
// serde_json writes non-ASCII text as-is (UTF-8, no \u escapes).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::error::ReportError;
use crate::domain::label_map::LabelMap;
use crate::domain::record::LabeledSample;
use crate::infra::metrics::{argmax, ClassificationMetrics};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisclassifiedEntry {
    pub true_author:      String,
    pub predicted_author: String,
    pub code:             String,
}

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub metrics:       ClassificationMetrics,
    pub misclassified: Vec<MisclassifiedEntry>,
}

pub struct ReportWriter<'a> {
    labels: &'a LabelMap,
}

impl<'a> ReportWriter<'a> {
    pub fn new(labels: &'a LabelMap) -> Self {
        Self { labels }
    }

    /// Score `logits` (one row per sample, same order) against `samples`.
    pub fn evaluate(
        &self,
        samples: &[LabeledSample],
        logits:  &[Vec<f32>],
    ) -> Result<EvaluationReport, ReportError> {
        if samples.is_empty() {
            return Err(ReportError::EmptySplit);
        }
        if samples.len() != logits.len() {
            return Err(ReportError::LengthMismatch { logits: logits.len(), samples: samples.len() });
        }

        let y_pred: Vec<usize> = logits.iter().map(|row| argmax(row)).collect();
        let y_true: Vec<usize> = samples.iter().map(|s| s.label).collect();
        let metrics = ClassificationMetrics::compute(&y_true, &y_pred, self.labels.len());

        let mut misclassified = Vec::new();
        for (sample, &pred) in samples.iter().zip(&y_pred) {
            if pred == sample.label {
                continue;
            }
            let predicted_author = self
                .labels
                .author_of(pred)
                .ok_or(ReportError::UnknownLabel(pred))?;
            misclassified.push(MisclassifiedEntry {
                true_author:      sample.author.clone(),
                predicted_author: predicted_author.to_string(),
                code:             sample.code.clone(),
            });
        }

        Ok(EvaluationReport { metrics, misclassified })
    }
}

impl EvaluationReport {
    /// Write the misclassified entries as an indented JSON array.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.misclassified)?;
        std::fs::write(path, json)
            .with_context(|| format!("Cannot write report to '{}'", path.display()))?;

        tracing::info!(
            "Wrote {} misclassified samples to '{}'",
            self.misclassified.len(),
            path.display()
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample(code: &str, author: &str, label: usize) -> LabeledSample {
        LabeledSample { code: code.into(), author: author.into(), label }
    }

    fn labels() -> LabelMap {
        LabelMap::from_authors(&["ana".to_string(), "ben".to_string(), "cat".to_string()])
    }

    #[test]
    fn test_entries_are_exactly_the_disagreements() {
        let labels  = labels();
        let samples = vec![
            sample("a0", "ana", 0),
            sample("b0", "ben", 1),
            sample("c0", "cat", 2),
            sample("a1", "ana", 0),
        ];
        let logits = vec![
            vec![5.0, 0.0, 0.0], // correct
            vec![0.0, 0.0, 3.0], // ben → cat
            vec![0.0, 0.0, 1.0], // correct
            vec![0.0, 9.0, 0.0], // ana → ben
        ];

        let report = ReportWriter::new(&labels).evaluate(&samples, &logits).unwrap();
        assert_eq!(report.misclassified.len(), 2);
        assert!(report.misclassified.iter().all(|e| e.true_author != e.predicted_author));
        assert_eq!(report.misclassified[0].code, "b0");
        assert_eq!(report.misclassified[0].predicted_author, "cat");
        assert_eq!(report.misclassified[1].true_author, "ana");
        assert!((report.metrics.accuracy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let labels = labels();
        let err = ReportWriter::new(&labels)
            .evaluate(&[sample("x", "ana", 0)], &[])
            .unwrap_err();
        assert!(matches!(err, ReportError::LengthMismatch { logits: 0, samples: 1 }));
    }

    #[test]
    fn test_empty_split_rejected() {
        let labels = labels();
        let err = ReportWriter::new(&labels).evaluate(&[], &[]).unwrap_err();
        assert!(matches!(err, ReportError::EmptySplit));
    }

    #[test]
    fn test_json_preserves_non_ascii() {
        let labels  = labels();
        let samples = vec![sample("print(\"héllo — 世界\")", "ana", 0)];
        let report  = ReportWriter::new(&labels).evaluate(&samples, &[vec![0.0, 1.0, 0.0]]).unwrap();

        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("misclassified.json");
        report.write_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("héllo — 世界"));
        assert!(text.contains("\n  {"));

        let back: Vec<MisclassifiedEntry> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, report.misclassified);
    }
}
