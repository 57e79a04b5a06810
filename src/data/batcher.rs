// ============================================================
// Layer 4 — Author Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks EncodedExamples into
// tensors of shape [batch_size, max_len] plus a label vector.
//
// All sequences are already padded to the same length by the
// Encoder, so batching is a flatten + reshape:
//   [s1_t1, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::EncodedExample;
use crate::data::encoder::EncodedInput;

/// A batch of examples ready for the classifier forward pass.
#[derive(Debug, Clone)]
pub struct AuthorBatch<B: Backend> {
    /// Token ids: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Author labels: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct AuthorBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> AuthorBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack unlabelled inputs (used at prediction time).
    pub fn inputs(&self, items: &[EncodedInput]) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
        let batch_size = items.len();
        let seq_len    = items.first().map_or(0, |i| i.input_ids.len());

        let ids: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();
        let mask: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();

        (self.matrix(&ids, batch_size, seq_len), self.matrix(&mask, batch_size, seq_len))
    }

    fn matrix(&self, flat: &[i32], rows: usize, cols: usize) -> Tensor<B, 2, Int> {
        Tensor::<B, 1, Int>::from_ints(flat, &self.device).reshape([rows, cols])
    }
}

impl<B: Backend> Batcher<EncodedExample, AuthorBatch<B>> for AuthorBatcher<B> {
    fn batch(&self, items: Vec<EncodedExample>) -> AuthorBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map_or(0, |i| i.input_ids.len());

        let ids: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();
        let mask: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        AuthorBatch {
            input_ids:      self.matrix(&ids, batch_size, seq_len),
            attention_mask: self.matrix(&mask, batch_size, seq_len),
            labels:         Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes() {
        let batcher = AuthorBatcher::<NdArray>::new(Default::default());
        let items = vec![
            EncodedExample { input_ids: vec![2, 7, 3, 0], attention_mask: vec![1, 1, 1, 0], label: 1 },
            EncodedExample { input_ids: vec![2, 3, 0, 0], attention_mask: vec![1, 1, 0, 0], label: 0 },
        ];
        let batch = batcher.batch(items);

        assert_eq!(batch.input_ids.dims(), [2, 4]);
        assert_eq!(batch.attention_mask.dims(), [2, 4]);
        assert_eq!(batch.labels.dims(), [2]);

        let mask_sum: i64 = batch.attention_mask.sum().into_scalar().elem::<i64>();
        assert_eq!(mask_sum, 5);
    }
}
