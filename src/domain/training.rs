// ============================================================
// Layer 3 — Training Plan & Evaluation Records
// ============================================================
// Describes WHAT the training service should do (epochs,
// batch sizes, evaluation cadence, checkpoint retention,
// early stopping) without saying HOW; the ml layer owns
// the Burn implementation.

use serde::{Deserialize, Serialize};

/// When to run an evaluation pass (and save a checkpoint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalStrategy {
    /// At the end of every epoch
    Epoch,
    /// Every n optimiser steps
    Steps(usize),
}

impl EvalStrategy {
    /// `0` means "once per epoch".
    pub fn from_steps(steps: usize) -> Self {
        if steps == 0 { Self::Epoch } else { Self::Steps(steps) }
    }
}

/// The evaluation metric used to pick the best checkpoint
/// and to drive early stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorMetric {
    EvalLoss,
    Accuracy,
    WeightedF1,
}

impl MonitorMetric {
    pub fn value(&self, record: &EvalRecord) -> f64 {
        match self {
            Self::EvalLoss   => record.eval_loss,
            Self::Accuracy   => record.accuracy,
            Self::WeightedF1 => record.weighted_f1,
        }
    }

    pub fn greater_is_better(&self) -> bool {
        !matches!(self, Self::EvalLoss)
    }

    /// True when `candidate` beats `best` by more than `min_delta`.
    pub fn improves(&self, candidate: f64, best: f64, min_delta: f64) -> bool {
        if self.greater_is_better() {
            candidate > best + min_delta
        } else {
            candidate < best - min_delta
        }
    }
}

/// Everything the training service needs besides the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub epochs:           usize,
    pub train_batch_size: usize,
    pub eval_batch_size:  usize,
    pub learning_rate:    f64,
    pub weight_decay:     f64,
    pub eval_strategy:    EvalStrategy,
    /// Number of most recent checkpoints to keep (the best one is always kept)
    pub save_total_limit: usize,
    pub monitor:          MonitorMetric,
    /// Evaluations without improvement before stopping; 0 disables early stopping
    pub patience:         usize,
    pub min_delta:        f64,
    pub seed:             u64,
    pub num_workers:      usize,
}

impl Default for TrainingPlan {
    fn default() -> Self {
        Self {
            epochs:           10,
            train_batch_size: 8,
            eval_batch_size:  16,
            learning_rate:    2e-4,
            weight_decay:     0.01,
            eval_strategy:    EvalStrategy::Epoch,
            save_total_limit: 2,
            monitor:          MonitorMetric::WeightedF1,
            patience:         3,
            min_delta:        0.0,
            seed:             42,
            num_workers:      1,
        }
    }
}

/// Metrics from one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRecord {
    pub epoch:       usize,
    /// Global optimiser step at which the evaluation ran
    pub step:        usize,
    pub train_loss:  f64,
    pub eval_loss:   f64,
    pub accuracy:    f64,
    pub weighted_f1: f64,
}

/// What the training service reports back once it is done.
#[derive(Debug, Clone, Default)]
pub struct TrainingOutcome {
    pub history:       Vec<EvalRecord>,
    pub best:          Option<EvalRecord>,
    pub stopped_early: bool,
    pub total_steps:   usize,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn record(eval_loss: f64, accuracy: f64, weighted_f1: f64) -> EvalRecord {
        EvalRecord { epoch: 1, step: 10, train_loss: 1.0, eval_loss, accuracy, weighted_f1 }
    }

    #[test]
    fn test_loss_improves_downwards() {
        let m = MonitorMetric::EvalLoss;
        assert!(m.improves(0.5, 0.6, 0.0));
        assert!(!m.improves(0.6, 0.5, 0.0));
        // within min_delta is not an improvement
        assert!(!m.improves(0.59, 0.6, 0.05));
    }

    #[test]
    fn test_f1_improves_upwards() {
        let m = MonitorMetric::WeightedF1;
        assert!(m.improves(0.8, 0.7, 0.0));
        assert!(!m.improves(0.7, 0.8, 0.0));
        assert_eq!(m.value(&record(2.0, 0.5, 0.4)), 0.4);
    }

    #[test]
    fn test_eval_strategy_from_steps() {
        assert_eq!(EvalStrategy::from_steps(0), EvalStrategy::Epoch);
        assert_eq!(EvalStrategy::from_steps(50), EvalStrategy::Steps(50));
    }
}
