// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full attribution pipeline in order:
//
//   Step 1: Load the CSV corpus          (Layer 4 - data)
//   Step 2: Filter rows and authors      (Layer 4 - data)
//   Step 3: Map authors to labels        (Layer 3 - domain)
//   Step 4: Stratified train/test split  (Layer 4 - data)
//   Step 5: Load or build tokenizer      (Layer 6 - infra)
//   Step 6: Build the classifier         (Layer 5 - ml)
//   Step 7: Save config, labels, vocab   (Layer 6 - infra)
//   Step 8: Run training loop            (Layer 5 - ml)
//   Step 9: Score the test split         (Layer 6 - infra)
//
// Every artefact `attribute` needs ends up in
// {output_dir}/checkpoints, so that directory can also be
// passed back in as --model-dir to start from the trained encoder.

use anyhow::{bail, Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::data::{
    encoder::Encoder,
    filter::CorpusFilter,
    loader::{CorpusSchema, CsvCorpusLoader},
    preprocessor::Preprocessor,
    splitter::stratified_split,
};
use crate::domain::{
    label_map::LabelMap,
    traits::{CorpusSource, TrainingService},
    training::{EvalStrategy, MonitorMetric, TrainingOutcome, TrainingPlan},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    device::ExecutionConfig,
    metrics::{ClassificationMetrics, MetricsLogger},
    report::ReportWriter,
    tokenizer_store::{embedding_rows, TokenizerStore, TOKENIZER_FILE},
};
use crate::ml::{
    model::{AuthorClassifierConfig, TextEncoderConfig},
    trainer::{BurnTrainer, TrainBackend},
};

pub const MISCLASSIFIED_FILE: &str = "misclassified.json";

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a run needs. Saved as train_config.json next to the
// checkpoints so `attribute` can rebuild the same encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_path:          String,
    pub output_dir:         String,
    /// Directory with tokenizer.json and (optionally) pretrained encoder weights
    pub model_dir:          String,

    pub code_column:        String,
    pub author_column:      String,
    pub newline_column:     String,
    pub min_newlines:       i64,
    pub min_author_support: usize,

    pub test_fraction:      f64,
    /// Fraction of the train part held out for evaluation; 0 evaluates on the test split
    pub eval_fraction:      f64,
    pub seed:               u64,

    pub max_seq_len:        usize,
    pub vocab_size:         usize,

    pub epochs:             usize,
    pub batch_size:         usize,
    pub eval_batch_size:    usize,
    pub lr:                 f64,
    pub weight_decay:       f64,
    /// Evaluate every n steps; 0 means once per epoch
    pub eval_steps:         usize,
    pub save_total_limit:   usize,
    pub patience:           usize,
    pub min_delta:          f64,
    pub monitor:            MonitorMetric,

    pub d_model:            usize,
    pub num_heads:          usize,
    pub num_layers:         usize,
    pub d_ff:               usize,
    pub dropout:            f64,

    pub num_workers:        usize,
    pub execution:          ExecutionConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let schema = CorpusSchema::default();
        let filter = CorpusFilter::default();
        let plan   = TrainingPlan::default();
        Self {
            data_path:          "data/corpus.csv".to_string(),
            output_dir:         "output".to_string(),
            model_dir:          "model".to_string(),
            code_column:        schema.code_column,
            author_column:      schema.author_column,
            newline_column:     schema.newline_column,
            min_newlines:       filter.min_newlines,
            min_author_support: filter.min_author_support,
            test_fraction:      0.2,
            eval_fraction:      0.0,
            seed:               plan.seed,
            max_seq_len:        512,
            vocab_size:         30522,
            epochs:             plan.epochs,
            batch_size:         plan.train_batch_size,
            eval_batch_size:    plan.eval_batch_size,
            lr:                 plan.learning_rate,
            weight_decay:       plan.weight_decay,
            eval_steps:         0,
            save_total_limit:   plan.save_total_limit,
            patience:           plan.patience,
            min_delta:          plan.min_delta,
            monitor:            plan.monitor,
            d_model:            256,
            num_heads:          8,
            num_layers:         6,
            d_ff:               1024,
            dropout:            0.1,
            num_workers:        plan.num_workers,
            execution:          ExecutionConfig::default(),
        }
    }
}

impl TrainConfig {
    pub fn schema(&self) -> CorpusSchema {
        CorpusSchema {
            code_column:    self.code_column.clone(),
            author_column:  self.author_column.clone(),
            newline_column: self.newline_column.clone(),
        }
    }

    pub fn filter(&self) -> CorpusFilter {
        CorpusFilter {
            min_newlines:       self.min_newlines,
            min_author_support: self.min_author_support,
        }
    }

    pub fn training_plan(&self) -> TrainingPlan {
        TrainingPlan {
            epochs:           self.epochs,
            train_batch_size: self.batch_size,
            eval_batch_size:  self.eval_batch_size,
            learning_rate:    self.lr,
            weight_decay:     self.weight_decay,
            eval_strategy:    EvalStrategy::from_steps(self.eval_steps),
            save_total_limit: self.save_total_limit,
            monitor:          self.monitor,
            patience:         self.patience,
            min_delta:        self.min_delta,
            seed:             self.seed,
            num_workers:      self.num_workers,
        }
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join("checkpoints")
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.eval_batch_size == 0 {
            bail!("Batch sizes must be at least 1");
        }
        if self.epochs == 0 {
            bail!("--epochs must be at least 1");
        }
        if !(0.0..1.0).contains(&self.eval_fraction) {
            bail!("--eval-fraction must be in [0, 1), got {}", self.eval_fraction);
        }
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            bail!("d_model ({}) must be divisible by num_heads ({})", self.d_model, self.num_heads);
        }
        Ok(())
    }
}

/// What one finished run produced.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub authors:       usize,
    pub train_samples: usize,
    pub eval_samples:  usize,
    pub test_samples:  usize,
    pub outcome:       TrainingOutcome,
    pub test_metrics:  ClassificationMetrics,
    pub misclassified: usize,
    pub report_path:   PathBuf,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run on the wgpu backend selected by the execution config.
    pub fn execute(&self) -> Result<TrainSummary> {
        let device = self.config.execution.wgpu_device();
        tracing::info!("Using device {:?}", device);
        self.execute_on::<TrainBackend>(device)
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load the corpus ───────────────────────────────────────────
        tracing::info!("Loading corpus from '{}'", cfg.data_path);
        let records = CsvCorpusLoader::new(&cfg.data_path, cfg.schema()).load_all()?;
        tracing::info!("Loaded {} rows", records.len());

        // ── Step 2: Filter ────────────────────────────────────────────────────
        let corpus = cfg.filter().apply(records)?;
        println!("Authors after filtering: {}", corpus.author_count());

        // ── Step 3: Label map ─────────────────────────────────────────────────
        let labels  = LabelMap::from_authors(&corpus.authors);
        let samples = corpus.into_labeled(&labels)?;

        // ── Step 4: Stratified split (+ optional eval carve-out) ──────────────
        let split = stratified_split(samples, cfg.test_fraction, cfg.seed)?;
        let test  = split.test;
        let (train, eval) = if cfg.eval_fraction > 0.0 {
            let carved = stratified_split(split.train, cfg.eval_fraction, cfg.seed)
                .context("Cannot carve an evaluation set out of the train split")?;
            (carved.train, carved.test)
        } else {
            let eval = test.clone();
            (split.train, eval)
        };
        tracing::info!(
            "Split: {} train, {} eval, {} test",
            train.len(),
            eval.len(),
            test.len()
        );

        // ── Step 5: Tokenizer & encoder ───────────────────────────────────────
        // Pretrained embeddings only pair with the vocabulary they were trained on
        let pretrained = CheckpointManager::new(&cfg.model_dir)?;
        let store      = TokenizerStore::new(&cfg.model_dir);
        if pretrained.has_encoder() && !store.exists() {
            bail!(
                "'{}' has pretrained encoder weights but no {}; add the tokenizer they were trained with",
                cfg.model_dir,
                TOKENIZER_FILE
            );
        }

        let preprocessor = Preprocessor::new();
        let vocab_texts: Vec<String> = train.iter().map(|s| preprocessor.clean(&s.code)).collect();
        let vocab_refs:  Vec<&str>   = vocab_texts.iter().map(String::as_str).collect();

        let tokenizer = store.load_or_build(&vocab_refs, cfg.vocab_size)?;
        let rows      = embedding_rows(&tokenizer);
        let encoder   = Arc::new(Encoder::new(tokenizer, cfg.max_seq_len)?);

        // ── Step 6: Classifier (pretrained encoder when available) ────────────
        let encoder_cfg = if pretrained.has_encoder() {
            let enc_cfg = pretrained.load_encoder_config()?;
            if enc_cfg.max_seq_len < cfg.max_seq_len {
                bail!(
                    "Pretrained encoder supports {} positions, but --max-seq-len is {}",
                    enc_cfg.max_seq_len,
                    cfg.max_seq_len
                );
            }
            if enc_cfg.vocab_size < rows {
                bail!(
                    "Pretrained encoder has {} embeddings, tokenizer needs {}",
                    enc_cfg.vocab_size,
                    rows
                );
            }
            enc_cfg
        } else {
            TextEncoderConfig::new(rows, cfg.max_seq_len, cfg.d_model, cfg.num_heads, cfg.num_layers, cfg.d_ff)
                .with_dropout(cfg.dropout)
        };
        let model_cfg = AuthorClassifierConfig::new(encoder_cfg.clone(), labels.len());

        let mut model = model_cfg.init::<B>(&device);
        if pretrained.has_encoder() {
            model.encoder = pretrained.load_encoder(model.encoder, &device)?;
            tracing::info!("Initialised encoder from '{}'", cfg.model_dir);
        }

        // ── Step 7: Persist everything inference needs ────────────────────────
        let ckpt = CheckpointManager::new(cfg.checkpoint_dir())?;
        ckpt.save_config(cfg)?;
        ckpt.save_model_config(&model_cfg)?;
        ckpt.save_labels(&labels)?;
        TokenizerStore::new(ckpt.dir()).save(encoder.tokenizer())?;

        // ── Step 8: Train ─────────────────────────────────────────────────────
        let logger  = MetricsLogger::new(&cfg.output_dir)?;
        let mut trainer = BurnTrainer::<B>::new(
            model,
            cfg.training_plan(),
            encoder,
            ckpt,
            logger,
            device,
            labels.len(),
        );
        let outcome = trainer.fit(&train, &eval)?;
        trainer.checkpoints().save_encoder(&trainer.model().encoder, &encoder_cfg)?;

        // ── Step 9: Score the held-out test split ─────────────────────────────
        let codes: Vec<&str> = test.iter().map(|s| s.code.as_str()).collect();
        let logits = trainer.predict_logits(&codes)?;
        let report = ReportWriter::new(&labels).evaluate(&test, &logits)?;

        let report_path = PathBuf::from(&cfg.output_dir).join(MISCLASSIFIED_FILE);
        report.write_json(&report_path)?;

        Ok(TrainSummary {
            authors:       labels.len(),
            train_samples: train.len(),
            eval_samples:  eval.len(),
            test_samples:  test.len(),
            outcome,
            test_metrics:  report.metrics,
            misclassified: report.misclassified.len(),
            report_path,
        })
    }
}
