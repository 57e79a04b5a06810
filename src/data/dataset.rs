// ============================================================
// Layer 4 — Author Dataset
// ============================================================
// Wraps labelled samples as a burn `Dataset`; each item is encoded
// only when the data loader asks for it.

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::encoder::Encoder;
use crate::domain::record::LabeledSample;

/// One tokenised, padded training example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedExample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub label:          usize,
}

/// Labelled samples, encoded lazily on access.
pub struct AuthorDataset {
    samples: Vec<LabeledSample>,
    encoder: Arc<Encoder>,
}

impl AuthorDataset {
    pub fn new(samples: Vec<LabeledSample>, encoder: Arc<Encoder>) -> Self {
        Self { samples, encoder }
    }
}

impl Dataset<EncodedExample> for AuthorDataset {
    fn get(&self, index: usize) -> Option<EncodedExample> {
        let sample  = self.samples.get(index)?;
        let encoded = self.encoder.encode_lossy(&sample.code);
        Some(EncodedExample {
            input_ids:      encoded.input_ids,
            attention_mask: encoded.attention_mask,
            label:          sample.label,
        })
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
