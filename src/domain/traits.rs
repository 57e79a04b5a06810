// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits:
//   - CsvCorpusLoader implements CorpusSource
//   - BurnTrainer     implements TrainingService

use anyhow::Result;

use crate::domain::record::{LabeledSample, Record};
use crate::domain::training::TrainingOutcome;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can produce raw corpus records.
pub trait CorpusSource {
    /// Load every record, unfiltered.
    fn load_all(&self) -> Result<Vec<Record>>;
}

// ─── TrainingService ──────────────────────────────────────────────────────────
/// The training collaborator: iterative optimisation with periodic
/// evaluation, best-checkpoint retention and early stopping.
///
/// The caller supplies data and reads back scalar metrics and raw
/// logits; optimisation details stay behind this trait.
pub trait TrainingService {
    /// Train on `train`, evaluating on `eval` at the configured cadence.
    /// On return the service holds the best checkpoint's weights.
    fn fit(&mut self, train: &[LabeledSample], eval: &[LabeledSample]) -> Result<TrainingOutcome>;

    /// Raw class logits for each code snippet, in input order.
    fn predict_logits(&self, codes: &[&str]) -> Result<Vec<Vec<f32>>>;
}
