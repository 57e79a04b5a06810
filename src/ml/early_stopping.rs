// ============================================================
// Layer 5 — Early Stopping
// ============================================================
// Tracks the best value of the monitored evaluation metric and
// counts evaluations without improvement.

use crate::domain::training::MonitorMetric;

/// Stops training once the monitored metric has not improved
/// for `patience` consecutive evaluations.
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    monitor:   MonitorMetric,
    /// Evaluations to wait for improvement; 0 disables stopping
    patience:  usize,
    min_delta: f64,
    best:      Option<f64>,
    pub(crate) evals_without_improvement: usize,
}

impl EarlyStopping {
    pub fn new(monitor: MonitorMetric, patience: usize, min_delta: f64) -> Self {
        Self {
            monitor,
            patience,
            min_delta,
            best: None,
            evals_without_improvement: 0,
        }
    }

    /// Record a new metric value. Returns true if it is the best so far.
    pub fn observe(&mut self, value: f64) -> bool {
        let improved = match self.best {
            None       => true,
            Some(best) => self.monitor.improves(value, best, self.min_delta),
        };
        if improved {
            self.best = Some(value);
            self.evals_without_improvement = 0;
        } else {
            self.evals_without_improvement += 1;
        }
        improved
    }

    pub fn should_stop(&self) -> bool {
        self.patience > 0 && self.evals_without_improvement >= self.patience
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_after_patience_on_loss() {
        let mut es = EarlyStopping::new(MonitorMetric::EvalLoss, 2, 0.0);
        assert!(es.observe(1.0));
        assert!(es.observe(0.8));
        assert!(!es.observe(0.9));
        assert!(!es.should_stop());
        assert!(!es.observe(0.85));
        assert!(es.should_stop());
        assert_eq!(es.best(), Some(0.8));
    }

    #[test]
    fn test_improvement_resets_counter() {
        let mut es = EarlyStopping::new(MonitorMetric::Accuracy, 2, 0.0);
        es.observe(0.5);
        es.observe(0.4);
        assert_eq!(es.evals_without_improvement, 1);
        assert!(es.observe(0.6));
        assert_eq!(es.evals_without_improvement, 0);
    }

    #[test]
    fn test_min_delta_counts_small_gains_as_stale() {
        let mut es = EarlyStopping::new(MonitorMetric::WeightedF1, 1, 0.05);
        es.observe(0.70);
        assert!(!es.observe(0.72));
        assert!(es.should_stop());
    }

    #[test]
    fn test_zero_patience_never_stops() {
        let mut es = EarlyStopping::new(MonitorMetric::EvalLoss, 0, 0.0);
        es.observe(1.0);
        for _ in 0..10 {
            es.observe(2.0);
        }
        assert!(!es.should_stop());
    }
}
