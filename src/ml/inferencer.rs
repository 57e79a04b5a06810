// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds a trained classifier from a checkpoint directory and
// attributes a single snippet, returning every author ranked by
// softmax probability.
use anyhow::{anyhow, Result};
use burn::prelude::*;
use burn::tensor::activation::softmax;

use crate::data::{batcher::AuthorBatcher, encoder::Encoder};
use crate::domain::label_map::LabelMap;
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::model::AuthorClassifier;

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend> {
    model:   AuthorClassifier<B>,
    encoder: Encoder,
    labels:  LabelMap,
    device:  B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg       = ckpt.load_config()?;
        let model_cfg = ckpt.load_model_config()?;
        let labels    = ckpt.load_labels()?;

        if labels.is_empty() {
            return Err(anyhow!("labels.json lists no authors"));
        }
        if model_cfg.num_classes != labels.len() {
            return Err(anyhow!(
                "Checkpoint has {} classes but labels.json lists {} authors",
                model_cfg.num_classes,
                labels.len()
            ));
        }

        let step  = ckpt.best_step()?;
        let model = ckpt.load_model(model_cfg.init::<B>(&device), step, &device)?;

        let tokenizer = TokenizerStore::new(ckpt.dir()).load()?;
        let encoder   = Encoder::new(tokenizer, cfg.max_seq_len)?;

        tracing::info!("Model loaded from checkpoint step {}", step);
        Ok(Self { model, encoder, labels, device })
    }

    /// (author, probability) for every known author, most likely first.
    pub fn predict(&self, code: &str) -> Result<Vec<(String, f32)>> {
        let input       = self.encoder.encode(code)?;
        tracing::debug!("Encoded {} real tokens", input.real_len());
        let (ids, mask) = AuthorBatcher::<B>::new(self.device.clone()).inputs(&[input]);

        let probs: Vec<f32> = softmax(self.model.forward(ids, mask), 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read probabilities: {e:?}"))?;

        let mut ranked: Vec<(String, f32)> = self
            .labels
            .authors()
            .iter()
            .cloned()
            .zip(probs)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        tracing::debug!("Top prediction: {:?}", ranked.first());
        Ok(ranked)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::infra::tokenizer_store::{build_in_memory, embedding_rows};
    use crate::ml::model::{AuthorClassifierConfig, TextEncoderConfig};
    use burn::backend::NdArray;

    fn write_checkpoint(dir: &std::path::Path) -> CheckpointManager {
        let ckpt   = CheckpointManager::new(dir).unwrap();
        let tok    = build_in_memory(&["fn main ( ) { }", "def f ( x ) :"], 32).unwrap();
        let cfg    = AuthorClassifierConfig::new(
            TextEncoderConfig::new(embedding_rows(&tok), 10, 8, 2, 1, 16),
            3,
        );
        let device = Default::default();

        ckpt.save_model(&cfg.init::<NdArray>(&device), 4).unwrap();
        ckpt.mark_best(4).unwrap();
        ckpt.save_model_config(&cfg).unwrap();
        ckpt.save_config(&TrainConfig { max_seq_len: 10, ..TrainConfig::default() }).unwrap();
        ckpt.save_labels(&LabelMap::from_authors(&["a".to_string(), "b".to_string(), "c".to_string()])).unwrap();
        TokenizerStore::new(dir).save(&tok).unwrap();
        ckpt
    }

    #[test]
    fn test_predict_ranks_all_authors() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = write_checkpoint(dir.path());

        let inf    = Inferencer::<NdArray>::from_checkpoint(&ckpt, Default::default()).unwrap();
        let ranked = inf.predict("fn main ( ) { }").unwrap();

        assert_eq!(ranked.len(), 3);
        let total: f32 = ranked.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_missing_best_checkpoint_errors() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = write_checkpoint(dir.path());
        std::fs::remove_file(dir.path().join("best_checkpoint.json")).unwrap();

        assert!(Inferencer::<NdArray>::from_checkpoint(&ckpt, Default::default()).is_err());
    }
}
