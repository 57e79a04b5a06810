// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The model architecture and everything that drives it.
//
//   model.rs         : transformer encoder + mean-pooled
//                       classification head
//
//   trainer.rs       : BurnTrainer: the TrainingService
//                       implementation (AdamW, periodic
//                       evaluation, checkpoints)
//
//   early_stopping.rs: patience counter on the monitored metric
//
//   inferencer.rs    : loads the best checkpoint and ranks
//                       authors for one snippet

pub mod model;

pub mod trainer;

pub mod early_stopping;

pub mod inferencer;
