// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define the core
// concepts of the system: corpus records, the author label map,
// training plans and the typed errors raised by the pipeline.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits

// Corpus rows and the paired samples carried through the pipeline
pub mod record;

// Author id <-> dense integer label bijection
pub mod label_map;

// Training plan, evaluation records and the monitored metric
pub mod training;

// Typed errors for each pipeline stage
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
