// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs     : classifier/encoder weights via Burn's
//                        CompactRecorder, checkpoint rotation,
//                        and the JSON side files (config,
//                        model config, labels, best step)
//
//   tokenizer_store.rs: loads tokenizer.json from the model
//                        directory or builds a word-level one
//
//   metrics.rs        : accuracy / weighted F1 and the
//                        per-evaluation metrics.csv log
//
//   report.rs         : test-split scoring and the
//                        misclassified.json dump
//
//   device.rs         : explicit device selection

pub mod checkpoint;

pub mod tokenizer_store;

pub mod metrics;

pub mod report;

pub mod device;
