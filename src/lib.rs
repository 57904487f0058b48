// THEORY:
// This file is the main entry point for the `drift_vision` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like a regression harness).
//
// The primary goal is to export the `DriftPipeline` and its associated data
// structures (`DriftPipelineConfig`, `RunReport`, the accumulator model) as the
// clean, high-level interface for the engine. The internal modules
// (`core_modules`) remain reachable for consumers that want the raw pieces —
// the pure differ, the normalizer, the reducer — without the pipeline wrapper.

pub mod core_modules;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod store;

// Re-export key data structures for the public API.
pub use crate::core_modules::analyzer::{analyze, ImageSummary};
pub use crate::core_modules::differ::{
    diff, diff_with_policy, AlphaPolicy, ChangedMap, DiffReport, DEFAULT_SAMPLE_CAP,
};
pub use crate::core_modules::history::{
    normalize, pattern_key, HistoryAccumulator, ImageHistory, PixelStat,
};
pub use crate::core_modules::merge::{merge, RunDeltas};
pub use crate::core_modules::pixel_buffer::pixel_buffer::PixelBuffer;
pub use crate::pipeline::{DriftPipeline, DriftPipelineConfig, ImageSet, Report, RunReport};
pub use crate::store::HistoryStore;
