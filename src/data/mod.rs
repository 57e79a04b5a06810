// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw CSV corpus to tensor batches:
//
//   corpus.csv
//       │
//       ▼
//   CsvCorpusLoader   → reads rows into Records
//       │
//       ▼
//   CorpusFilter      → newline heuristic + author support
//       │
//       ▼
//   stratified_split  → per-author train/test partition
//       │
//       ▼
//   Encoder           → Preprocessor + tokenizer → fixed-length ids
//       │
//       ▼
//   AuthorDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   AuthorBatcher     → stacks examples into tensor batches
//
// Each module is responsible for exactly one step.

/// Reads the CSV corpus with the csv crate
pub mod loader;

/// Row and author filters
pub mod filter;

/// Layout-preserving text normalisation
pub mod preprocessor;

/// Seeded stratified train/test split
pub mod splitter;

/// [CLS] … [SEP] + padding to a fixed length
pub mod encoder;

/// Implements Burn's Dataset trait for labelled snippets
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
