// ============================================================
// Layer 5 — Training Loop
// ============================================================
// BurnTrainer implements the TrainingService trait with Burn's
// DataLoader and AdamW.
//
// Each evaluation pass (per epoch, or every N steps):
//   1. runs the eval split on model.valid() (no autodiff, no dropout)
//   2. computes eval loss, accuracy and weighted F1
//   3. appends a row to metrics.csv
//   4. saves checkpoint-{step}, rotates old checkpoints
//   5. updates the best checkpoint and the early-stopping counter
//
// When training ends (all epochs done or patience exhausted)
// the best checkpoint is loaded back into the model.
//
// Key Burn insight:
//   - Training uses B (Autodiff<...>) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - the validation batcher must also use B::InnerBackend

use anyhow::{anyhow, bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::data::{
    batcher::{AuthorBatch, AuthorBatcher},
    dataset::AuthorDataset,
    encoder::{EncodedInput, Encoder},
};
use crate::domain::record::LabeledSample;
use crate::domain::traits::TrainingService;
use crate::domain::training::{EvalRecord, EvalStrategy, TrainingOutcome, TrainingPlan};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::device::release_device_cache;
use crate::infra::metrics::{argmax, ClassificationMetrics, MetricsLogger};
use crate::ml::early_stopping::EarlyStopping;
use crate::ml::model::AuthorClassifier;

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

type EvalLoader<B> = Arc<dyn DataLoader<AuthorBatch<<B as AutodiffBackend>::InnerBackend>>>;

pub struct BurnTrainer<B: AutodiffBackend> {
    model:       AuthorClassifier<B>,
    plan:        TrainingPlan,
    encoder:     Arc<Encoder>,
    ckpt:        CheckpointManager,
    logger:      MetricsLogger,
    device:      B::Device,
    num_classes: usize,
}

impl<B: AutodiffBackend> BurnTrainer<B> {
    pub fn new(
        model:       AuthorClassifier<B>,
        plan:        TrainingPlan,
        encoder:     Arc<Encoder>,
        ckpt:        CheckpointManager,
        logger:      MetricsLogger,
        device:      B::Device,
        num_classes: usize,
    ) -> Self {
        Self { model, plan, encoder, ckpt, logger, device, num_classes }
    }

    /// The current weights (the best checkpoint once `fit` has returned).
    pub fn model(&self) -> &AuthorClassifier<B> {
        &self.model
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.ckpt
    }

    fn evaluate(
        &self,
        model:      &AuthorClassifier<B::InnerBackend>,
        loader:     &EvalLoader<B>,
        epoch:      usize,
        step:       usize,
        train_loss: f64,
    ) -> Result<EvalRecord> {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut y_true   = Vec::new();
        let mut y_pred   = Vec::new();

        for batch in loader.iter() {
            let labels = batch.labels.clone();
            let (loss, logits) = model.forward_loss(batch.input_ids, batch.attention_mask, batch.labels);

            loss_sum += loss.into_scalar().elem::<f64>();
            batches  += 1;

            y_pred.extend(logit_rows(logits)?.iter().map(|row| argmax(row)));
            y_true.extend(label_values(labels)?);
        }

        let metrics = ClassificationMetrics::compute(&y_true, &y_pred, self.num_classes);
        Ok(EvalRecord {
            epoch,
            step,
            train_loss,
            eval_loss:   if batches > 0 { loss_sum / batches as f64 } else { f64::NAN },
            accuracy:    metrics.accuracy,
            weighted_f1: metrics.weighted_f1,
        })
    }

    /// Evaluate, log, checkpoint. Returns true when training should stop.
    fn checkpoint_round(
        &self,
        model:      &AuthorClassifier<B>,
        loader:     &EvalLoader<B>,
        epoch:      usize,
        step:       usize,
        train_loss: f64,
        stopper:    &mut EarlyStopping,
        outcome:    &mut TrainingOutcome,
    ) -> Result<bool> {
        let record = self.evaluate(&model.valid(), loader, epoch, step, train_loss)?;

        println!(
            "Epoch {:>3}/{} | step {:>6} | train_loss={:.4} | eval_loss={:.4} | acc={:.1}% | f1={:.4}",
            epoch, self.plan.epochs, step, record.train_loss, record.eval_loss,
            record.accuracy * 100.0, record.weighted_f1,
        );

        self.logger.log(&record)?;
        self.ckpt.save_model(model, step)?;

        if stopper.observe(self.plan.monitor.value(&record)) {
            self.ckpt.mark_best(step)?;
            outcome.best = Some(record.clone());
            tracing::info!("New best checkpoint at step {}", step);
        }
        self.ckpt
            .rotate(self.plan.save_total_limit, outcome.best.as_ref().map(|b| b.step))?;

        outcome.history.push(record);
        Ok(stopper.should_stop())
    }
}

impl<B: AutodiffBackend> TrainingService for BurnTrainer<B> {
    fn fit(&mut self, train: &[LabeledSample], eval: &[LabeledSample]) -> Result<TrainingOutcome> {
        if train.is_empty() {
            bail!("Training split is empty");
        }
        if eval.is_empty() {
            bail!("Evaluation split is empty");
        }

        let plan = self.plan.clone();
        release_device_cache::<B>(&self.device, "before training");

        // ── Data loaders ──────────────────────────────────────────────────────
        let train_loader = DataLoaderBuilder::new(AuthorBatcher::<B>::new(self.device.clone()))
            .batch_size(plan.train_batch_size)
            .shuffle(plan.seed)
            .num_workers(plan.num_workers.max(1))
            .build(AuthorDataset::new(train.to_vec(), self.encoder.clone()));

        let eval_loader: EvalLoader<B> =
            DataLoaderBuilder::new(AuthorBatcher::<B::InnerBackend>::new(self.device.clone()))
                .batch_size(plan.eval_batch_size)
                .num_workers(plan.num_workers.max(1))
                .build(AuthorDataset::new(eval.to_vec(), self.encoder.clone()));

        tracing::info!(
            "Training on {} samples, evaluating on {} ({:?}), metrics → '{}'",
            train.len(),
            eval.len(),
            plan.eval_strategy,
            self.logger.csv_path().display()
        );

        // ── Optimiser & bookkeeping ───────────────────────────────────────────
        let mut optim = AdamWConfig::new()
            .with_weight_decay(plan.weight_decay as f32)
            .init();
        let mut model   = self.model.clone();
        let mut stopper = EarlyStopping::new(plan.monitor, plan.patience, plan.min_delta);
        let mut outcome = TrainingOutcome::default();

        let mut step           = 0usize;
        let mut last_eval_step = None;
        let mut loss_sum       = 0.0f64;
        let mut loss_batches   = 0usize;
        let mut epoch          = 0usize;

        // ── Epoch loop ────────────────────────────────────────────────────────
        'epochs: for e in 1..=plan.epochs {
            epoch = e;

            for batch in train_loader.iter() {
                let (loss, _) = model.forward_loss(batch.input_ids, batch.attention_mask, batch.labels);

                loss_sum     += loss.clone().into_scalar().elem::<f64>();
                loss_batches += 1;

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(plan.learning_rate, model, grads);
                step += 1;

                if let EvalStrategy::Steps(every) = plan.eval_strategy {
                    if step % every == 0 {
                        let train_loss = mean(loss_sum, loss_batches);
                        (loss_sum, loss_batches) = (0.0, 0);
                        last_eval_step = Some(step);
                        if self.checkpoint_round(&model, &eval_loader, epoch, step, train_loss, &mut stopper, &mut outcome)? {
                            outcome.stopped_early = true;
                            break 'epochs;
                        }
                    }
                }
            }

            if plan.eval_strategy == EvalStrategy::Epoch {
                let train_loss = mean(loss_sum, loss_batches);
                (loss_sum, loss_batches) = (0.0, 0);
                last_eval_step = Some(step);
                if self.checkpoint_round(&model, &eval_loader, epoch, step, train_loss, &mut stopper, &mut outcome)? {
                    outcome.stopped_early = true;
                    break 'epochs;
                }
            }
        }

        // Steps that ran after the last scheduled evaluation still get scored
        if !outcome.stopped_early && last_eval_step != Some(step) {
            let train_loss = mean(loss_sum, loss_batches);
            self.checkpoint_round(&model, &eval_loader, epoch, step, train_loss, &mut stopper, &mut outcome)?;
        }

        if outcome.stopped_early {
            println!(
                "Early stopping: no improvement in {:?} for {} evaluations (best {:.4})",
                plan.monitor,
                plan.patience,
                stopper.best().unwrap_or(f64::NAN)
            );
        }

        // ── Restore best weights ──────────────────────────────────────────────
        if let Some(best) = &outcome.best {
            model = self.ckpt.load_model(model, best.step, &self.device)?;
            tracing::info!(
                "Loaded best checkpoint (step {}, {:?}={:.4})",
                best.step,
                plan.monitor,
                plan.monitor.value(best)
            );
        }

        self.model          = model;
        outcome.total_steps = step;

        release_device_cache::<B>(&self.device, "after training");
        tracing::info!("Training complete after {} steps", step);
        Ok(outcome)
    }

    fn predict_logits(&self, codes: &[&str]) -> Result<Vec<Vec<f32>>> {
        let model   = self.model.valid();
        let batcher = AuthorBatcher::<B::InnerBackend>::new(self.device.clone());

        let mut rows = Vec::with_capacity(codes.len());
        for chunk in codes.chunks(self.plan.eval_batch_size.max(1)) {
            let inputs: Vec<EncodedInput> = chunk
                .iter()
                .map(|code| self.encoder.encode(code))
                .collect::<Result<_, _>>()?;
            let (ids, mask) = batcher.inputs(&inputs);
            rows.extend(logit_rows(model.forward(ids, mask))?);
        }
        Ok(rows)
    }
}

fn mean(sum: f64, n: usize) -> f64 {
    if n > 0 { sum / n as f64 } else { f64::NAN }
}

/// [batch, classes] → one Vec<f32> per row
pub fn logit_rows<B: Backend>(logits: Tensor<B, 2>) -> Result<Vec<Vec<f32>>> {
    let [rows, cols] = logits.dims();
    let flat = logits
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read logits: {e:?}"))?;
    Ok(flat.chunks(cols.max(1)).take(rows).map(<[f32]>::to_vec).collect())
}

fn label_values<B: Backend>(labels: Tensor<B, 1, Int>) -> Result<Vec<usize>> {
    let values = labels
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow!("Cannot read labels: {e:?}"))?;
    Ok(values.into_iter().map(|v| v as usize).collect())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::training::MonitorMetric;
    use crate::infra::tokenizer_store::build_in_memory;
    use crate::ml::model::{AuthorClassifierConfig, TextEncoderConfig};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn samples(per_author: usize) -> Vec<LabeledSample> {
        let styles = [("ana", "let mut x = 0 ;"), ("ben", "for i in range ( n ) :")];
        styles
            .iter()
            .enumerate()
            .flat_map(|(label, (author, code))| {
                (0..per_author).map(move |i| LabeledSample {
                    code:   format!("{code} {i}"),
                    author: author.to_string(),
                    label,
                })
            })
            .collect()
    }

    fn trainer(dir: &std::path::Path, plan: TrainingPlan) -> BurnTrainer<TestBackend> {
        let texts: Vec<String> = samples(10).into_iter().map(|s| s.code).collect();
        let refs:  Vec<&str>   = texts.iter().map(String::as_str).collect();
        let tok     = build_in_memory(&refs, 64).unwrap();
        let rows    = crate::infra::tokenizer_store::embedding_rows(&tok);
        let encoder = Arc::new(Encoder::new(tok, 12).unwrap());

        let device = Default::default();
        let cfg    = AuthorClassifierConfig::new(TextEncoderConfig::new(rows, 12, 16, 2, 1, 32), 2);
        let model  = cfg.init::<TestBackend>(&device);

        BurnTrainer::new(
            model,
            plan,
            encoder,
            CheckpointManager::new(dir).unwrap(),
            MetricsLogger::new(dir).unwrap(),
            device,
            2,
        )
    }

    fn plan(eval_strategy: EvalStrategy, epochs: usize) -> TrainingPlan {
        TrainingPlan {
            epochs,
            train_batch_size: 4,
            eval_batch_size:  4,
            learning_rate:    1e-3,
            eval_strategy,
            save_total_limit: 1,
            monitor:          MonitorMetric::EvalLoss,
            patience:         0,
            ..TrainingPlan::default()
        }
    }

    #[test]
    fn test_fit_per_epoch_evaluates_and_keeps_best() {
        let dir  = tempfile::tempdir().unwrap();
        let data = samples(10);
        let (train, eval): (Vec<_>, Vec<_>) = data.into_iter().partition(|s| !s.code.ends_with(" 9"));

        let mut t   = trainer(dir.path(), plan(EvalStrategy::Epoch, 2));
        let outcome = t.fit(&train, &eval).unwrap();

        assert_eq!(outcome.history.len(), 2);
        assert!(!outcome.stopped_early);
        assert_eq!(outcome.total_steps, 10); // 18 samples / 4 → 5 batches × 2 epochs

        let best  = outcome.best.as_ref().unwrap();
        let saved = t.checkpoints().saved_steps().unwrap();
        assert!(saved.contains(&best.step));
        assert_eq!(t.checkpoints().best_step().unwrap(), best.step);
        assert!(dir.path().join("metrics.csv").exists());
    }

    #[test]
    fn test_fit_step_cadence_scores_trailing_steps() {
        let dir  = tempfile::tempdir().unwrap();
        let data = samples(10);
        let (train, eval): (Vec<_>, Vec<_>) = data.into_iter().partition(|s| !s.code.ends_with(" 0"));

        let mut t   = trainer(dir.path(), plan(EvalStrategy::Steps(3), 1));
        let outcome = t.fit(&train, &eval).unwrap();

        // 18 samples / 4 → 5 steps: evaluated at step 3 and again at step 5
        let steps: Vec<usize> = outcome.history.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![3, 5]);
    }

    #[test]
    fn test_predict_logits_shape() {
        let dir = tempfile::tempdir().unwrap();
        let t   = trainer(dir.path(), plan(EvalStrategy::Epoch, 1));

        let logits = t.predict_logits(&["let mut y = 1 ;", "for j in", "", "x"]).unwrap();
        assert_eq!(logits.len(), 4);
        assert!(logits.iter().all(|row| row.len() == 2));
    }

    #[test]
    fn test_empty_eval_split_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = trainer(dir.path(), plan(EvalStrategy::Epoch, 1));
        assert!(t.fit(&samples(2), &[]).is_err());
    }
}
