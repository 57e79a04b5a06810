// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two things live here:
//
//   ClassificationMetrics: accuracy and support-weighted F1
//                           computed from true/predicted labels.
//                           This is the "metrics function" the
//                           trainer calls at every evaluation.
//
//   MetricsLogger        : appends one CSV row per evaluation
//                           to {output_dir}/metrics.csv
//
// Weighted F1 averages per-class F1 weighted by each class's
// number of true instances (its support), which matches the
// usual multi-class "weighted" average.
//
// Example CSV output:
//   epoch,step,train_loss,eval_loss,accuracy,weighted_f1
//   1,120,2.314500,2.101200,0.213000,0.187000

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::training::EvalRecord;

/// Accuracy and weighted F1 over a set of predictions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationMetrics {
    pub accuracy:    f64,
    pub weighted_f1: f64,
    pub total:       usize,
    pub correct:     usize,
}

impl ClassificationMetrics {
    /// `y_true` and `y_pred` must have equal length; labels >= `n_classes`
    /// still count towards accuracy but not towards any class's F1.
    pub fn compute(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Self {
        debug_assert_eq!(y_true.len(), y_pred.len());

        let total   = y_true.len().min(y_pred.len());
        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();

        let mut tp      = vec![0usize; n_classes];
        let mut fp      = vec![0usize; n_classes];
        let mut fn_     = vec![0usize; n_classes];
        let mut support = vec![0usize; n_classes];

        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t < n_classes {
                support[t] += 1;
            }
            if t == p {
                if t < n_classes {
                    tp[t] += 1;
                }
            } else {
                if p < n_classes {
                    fp[p] += 1;
                }
                if t < n_classes {
                    fn_[t] += 1;
                }
            }
        }

        let weighted_sum: f64 = (0..n_classes)
            .map(|c| {
                let p = ratio(tp[c], tp[c] + fp[c]);
                let r = ratio(tp[c], tp[c] + fn_[c]);
                let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
                f * support[c] as f64
            })
            .sum();
        let support_total: usize = support.iter().sum();

        Self {
            accuracy:    ratio(correct, total),
            weighted_f1: if support_total > 0 { weighted_sum / support_total as f64 } else { 0.0 },
            total,
            correct,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Index of the largest logit (first one on ties); 0 for an empty row.
pub fn argmax(logits: &[f32]) -> usize {
    logits
        .iter()
        .enumerate()
        .fold((0usize, f32::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v > bv { (i, v) } else { (bi, bv) }
        })
        .0
}

/// Logs evaluation records to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,step,train_loss,eval_loss,accuracy,weighted_f1")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EvalRecord) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.step, m.train_loss, m.eval_loss, m.accuracy, m.weighted_f1,
        )?;

        tracing::debug!(
            "Logged step {} metrics: eval_loss={:.4}, f1={:.4}",
            m.step,
            m.eval_loss,
            m.weighted_f1,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_f1_reference_value() {
        let y_true = [0, 1, 2, 0, 1, 2];
        let y_pred = [0, 2, 1, 0, 0, 1];
        let m = ClassificationMetrics::compute(&y_true, &y_pred, 3);
        assert!((m.accuracy - 1.0 / 3.0).abs() < 1e-9);
        assert!((m.weighted_f1 - 0.266_666_666).abs() < 1e-6);
    }

    #[test]
    fn test_perfect_predictions() {
        let y = [0, 1, 1, 2];
        let m = ClassificationMetrics::compute(&y, &y, 3);
        assert_eq!(m.accuracy, 1.0);
        assert!((m.weighted_f1 - 1.0).abs() < 1e-12);
        assert_eq!(m.correct, 4);
    }

    #[test]
    fn test_weighting_by_support() {
        // class 0 (support 3) perfect, class 1 (support 1) always wrong
        let y_true = [0, 0, 0, 1];
        let y_pred = [0, 0, 0, 0];
        let m = ClassificationMetrics::compute(&y_true, &y_pred, 2);
        // class 0: p = 3/4, r = 1 → f1 = 6/7
        assert!((m.weighted_f1 - (6.0 / 7.0) * 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let m = ClassificationMetrics::compute(&[], &[], 4);
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.weighted_f1, 0.0);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 2.0, -1.0]), 1);
        assert_eq!(argmax(&[1.0, 1.0]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_logger_appends_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        let rec    = EvalRecord { epoch: 1, step: 5, train_loss: 1.5, eval_loss: 1.25, accuracy: 0.5, weighted_f1: 0.4 };
        logger.log(&rec).unwrap();
        logger.log(&EvalRecord { step: 10, ..rec }).unwrap();

        let text  = std::fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1,5,1.500000,1.250000,0.500000,0.400000");
        assert!(lines[2].starts_with("1,10,"));
    }
}
