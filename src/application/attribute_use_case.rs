// ============================================================
// Layer 2 — AttributeUseCase
// ============================================================
// Loads a trained checkpoint directory once, then attributes
// source files to the most likely authors.

use anyhow::{Context, Result};
use std::path::Path;

use crate::infra::{checkpoint::CheckpointManager, device::ExecutionConfig};
use crate::ml::inferencer::{InferBackend, Inferencer};

pub struct AttributeUseCase {
    inferencer: Inferencer<InferBackend>,
}

impl AttributeUseCase {
    pub fn new(checkpoint_dir: impl AsRef<Path>, execution: &ExecutionConfig) -> Result<Self> {
        let ckpt       = CheckpointManager::new(checkpoint_dir.as_ref())?;
        let inferencer = Inferencer::from_checkpoint(&ckpt, execution.wgpu_device())?;
        Ok(Self { inferencer })
    }

    /// The `top_k` most likely authors of the file at `path`.
    pub fn attribute_file(&self, path: impl AsRef<Path>, top_k: usize) -> Result<Vec<(String, f32)>> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read source file '{}'", path.display()))?;
        self.attribute(&code, top_k)
    }

    pub fn attribute(&self, code: &str, top_k: usize) -> Result<Vec<(String, f32)>> {
        let mut ranked = self.inferencer.predict(code)?;
        ranked.truncate(top_k.max(1));
        Ok(ranked)
    }
}
