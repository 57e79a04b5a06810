// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder,
// plus the JSON side files needed to rebuild a model later.
//
// File layout of an output directory:
//   checkpoints/
//     checkpoint-120.mpk.gz   ← classifier weights at step 120
//     checkpoint-240.mpk.gz
//     best_checkpoint.json    ← step of the best checkpoint
//     model_config.json       ← AuthorClassifierConfig
//     train_config.json       ← full TrainConfig of the run
//     labels.json             ← LabelMap (author per label)
//     encoder.mpk.gz          ← final encoder weights (reusable)
//     encoder_config.json     ← TextEncoderConfig
//
// Only the `save_total_limit` most recent checkpoints are kept
// on disk; the best one is never deleted.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::application::train_use_case::TrainConfig;
use crate::domain::label_map::LabelMap;
use crate::ml::model::{AuthorClassifier, AuthorClassifierConfig, TextEncoder, TextEncoderConfig};

const CHECKPOINT_PREFIX: &str = "checkpoint-";
const RECORD_EXT:        &str = ".mpk.gz";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ── Classifier checkpoints ────────────────────────────────────────────────

    /// Save classifier weights as `checkpoint-{step}.mpk.gz`.
    pub fn save_model<B: Backend>(&self, model: &AuthorClassifier<B>, step: usize) -> Result<()> {
        // Recorder appends the extension itself
        let path = self.dir.join(format!("{CHECKPOINT_PREFIX}{step}"));
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint: step {}", step);
        Ok(())
    }

    pub fn load_model<B: Backend>(
        &self,
        model:  AuthorClassifier<B>,
        step:   usize,
        device: &B::Device,
    ) -> Result<AuthorClassifier<B>> {
        let path = self.dir.join(format!("{CHECKPOINT_PREFIX}{step}"));
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        Ok(model.load_record(record))
    }

    /// Steps of all checkpoints currently on disk, ascending.
    pub fn saved_steps(&self) -> Result<Vec<usize>> {
        let mut steps = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(step) = name
                .strip_prefix(CHECKPOINT_PREFIX)
                .and_then(|rest| rest.strip_suffix(RECORD_EXT))
                .and_then(|s| s.parse::<usize>().ok())
            {
                steps.push(step);
            }
        }
        steps.sort_unstable();
        Ok(steps)
    }

    /// Delete old checkpoints so at most `limit` remain, never deleting
    /// `keep`. A limit of 0 keeps everything. Returns the deleted steps.
    pub fn rotate(&self, limit: usize, keep: Option<usize>) -> Result<Vec<usize>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let steps = self.saved_steps()?;
        let mut excess = steps.len().saturating_sub(limit);
        let mut deleted = Vec::new();

        for step in steps {
            if excess == 0 {
                break;
            }
            if Some(step) == keep {
                continue;
            }
            let path = self.dir.join(format!("{CHECKPOINT_PREFIX}{step}{RECORD_EXT}"));
            fs::remove_file(&path)
                .with_context(|| format!("Cannot delete '{}'", path.display()))?;
            tracing::debug!("Rotated out checkpoint: step {}", step);
            deleted.push(step);
            excess -= 1;
        }
        Ok(deleted)
    }

    pub fn mark_best(&self, step: usize) -> Result<()> {
        self.write_json("best_checkpoint.json", &step)
    }

    pub fn best_step(&self) -> Result<usize> {
        self.read_json("best_checkpoint.json")
            .context("No best checkpoint recorded. Have you run 'train' first?")
    }

    // ── Reusable encoder ──────────────────────────────────────────────────────

    pub fn save_encoder<B: Backend>(&self, encoder: &TextEncoder<B>, cfg: &TextEncoderConfig) -> Result<()> {
        let path = self.dir.join("encoder");
        CompactRecorder::new()
            .record(encoder.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save encoder to '{}'", path.display()))?;
        self.write_json("encoder_config.json", cfg)
    }

    pub fn has_encoder(&self) -> bool {
        self.dir.join(format!("encoder{RECORD_EXT}")).exists()
            && self.dir.join("encoder_config.json").exists()
    }

    pub fn load_encoder_config(&self) -> Result<TextEncoderConfig> {
        self.read_json("encoder_config.json")
    }

    /// Load pretrained encoder weights into `encoder`.
    pub fn load_encoder<B: Backend>(&self, encoder: TextEncoder<B>, device: &B::Device) -> Result<TextEncoder<B>> {
        let path = self.dir.join("encoder");
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load encoder '{}'", path.display()))?;
        Ok(encoder.load_record(record))
    }

    // ── JSON side files ───────────────────────────────────────────────────────

    pub fn save_model_config(&self, cfg: &AuthorClassifierConfig) -> Result<()> {
        self.write_json("model_config.json", cfg)
    }

    pub fn load_model_config(&self) -> Result<AuthorClassifierConfig> {
        self.read_json("model_config.json")
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json("train_config.json", cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json("train_config.json")
    }

    pub fn save_labels(&self, labels: &LabelMap) -> Result<()> {
        self.write_json("labels.json", labels)
    }

    pub fn load_labels(&self) -> Result<LabelMap> {
        self.read_json("labels.json")
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid JSON in '{}'", path.display()))
    }
}
