// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each.
//
//   - No ML math or model code here
//   - No console output beyond the run summary
//   - Only workflow coordination

// Load → filter → split → train → report
pub mod train_use_case;

// Load → filter, print per-author support
pub mod stats_use_case;

// Checkpoint → predicted author of one file
pub mod attribute_use_case;
