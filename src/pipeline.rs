// THEORY:
// The `pipeline` module is the final, top-level API for the drift engine. It
// encapsulates the full diff -> merge -> analyze stack into a single, easy-to-use
// interface: hand it a baseline image set and the current render of the same
// set, and it returns a per-image report while folding the run into the
// accumulator it was constructed with.
//
// The pipeline holds no ambient state: the accumulator is passed in by the
// caller at construction (typically fresh from a `HistoryStore::load`) and
// handed back for persistence when the caller is done. Buffers likewise arrive
// as explicit arguments on every run.

use crate::core_modules::analyzer::{analyze, ImageSummary};
use crate::core_modules::differ::{diff_with_policy, AlphaPolicy, DiffReport, DEFAULT_SAMPLE_CAP};
use crate::core_modules::history::HistoryAccumulator;
use crate::core_modules::merge::{merge, RunDeltas};
use crate::core_modules::pixel_buffer::pixel_buffer::PixelBuffer;
use std::collections::BTreeMap;

/// A named set of buffers, as supplied by the rendering layer.
pub type ImageSet = BTreeMap<String, PixelBuffer>;

/// Configuration for the DriftPipeline, allowing for tunable behavior.
#[derive(Debug, Clone)]
pub struct DriftPipelineConfig {
    /// Cap on detailed sample records per image report.
    pub sample_cap: usize,
    /// Alpha-change counting policy applied to every comparison.
    pub alpha_policy: AlphaPolicy,
}

impl Default for DriftPipelineConfig {
    fn default() -> Self {
        Self {
            sample_cap: DEFAULT_SAMPLE_CAP,
            alpha_policy: AlphaPolicy::default(),
        }
    }
}

/// The detailed data package for a run that drifted from its baseline.
#[derive(Debug, Clone)]
pub struct DriftData {
    /// Names of the images whose buffers changed this run.
    pub changed_images: Vec<String>,
    /// Total changed pixels across all images this run.
    pub total_changed_pixels: u64,
}

/// The verdict of one run against the baseline.
#[derive(Debug, Clone)]
pub enum Report {
    NoDrift,
    DriftDetected(DriftData),
}

/// The full output of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub report: Report,
    /// Per-image diff details, keyed by image name.
    pub diffs: BTreeMap<String, DiffReport>,
    /// The sparse deltas this run contributed to the accumulator; also the
    /// payload for the store-side `merge_and_persist` entry point.
    pub deltas: RunDeltas,
}

/// The main, top-level struct for the drift engine.
pub struct DriftPipeline {
    config: DriftPipelineConfig,
    history: HistoryAccumulator,
}

impl DriftPipeline {
    /// The caller supplies the previously loaded accumulator; a fresh baseline
    /// starts from `HistoryAccumulator::empty()`.
    pub fn new(config: DriftPipelineConfig, history: HistoryAccumulator) -> Self {
        Self { config, history }
    }

    /// Diffs every image name present in both sets and folds the resulting
    /// deltas into the accumulator as one run. Names present in only one set
    /// are skipped: there is nothing comparable to report.
    pub fn process_run(&mut self, baseline: &ImageSet, current: &ImageSet) -> RunReport {
        let diffs = compare_sets(baseline, current, &self.config);

        let deltas: RunDeltas = diffs
            .iter()
            .map(|(name, report)| (name.clone(), report.changed_map.clone()))
            .collect();
        merge(&mut self.history, &deltas);

        let changed_images: Vec<String> = diffs
            .iter()
            .filter(|(_, report)| report.changed_pixels > 0)
            .map(|(name, _)| name.clone())
            .collect();
        let total_changed_pixels: u64 = diffs.values().map(|r| r.changed_pixels).sum();

        log::info!(
            "run {} folded: {} image(s), {} changed pixel(s)",
            self.history.runs,
            diffs.len(),
            total_changed_pixels
        );

        let report = if changed_images.is_empty() {
            Report::NoDrift
        } else {
            Report::DriftDetected(DriftData {
                changed_images,
                total_changed_pixels,
            })
        };

        RunReport {
            report,
            diffs,
            deltas,
        }
    }

    /// Derives the per-image summaries for display. Read-only.
    pub fn summaries(&self) -> BTreeMap<String, ImageSummary> {
        analyze(&self.history)
    }

    pub fn history(&self) -> &HistoryAccumulator {
        &self.history
    }

    /// Hands the accumulator back for persistence.
    pub fn into_history(self) -> HistoryAccumulator {
        self.history
    }
}

/// Diffs every image name present in both sets, without touching any
/// accumulator. Shared by the synchronous and parallel pipelines.
pub fn compare_sets(
    baseline: &ImageSet,
    current: &ImageSet,
    config: &DriftPipelineConfig,
) -> BTreeMap<String, DiffReport> {
    current
        .iter()
        .filter_map(|(name, curr)| {
            baseline.get(name).map(|prev| {
                let report =
                    diff_with_policy(prev, curr, config.sample_cap, config.alpha_policy);
                (name.clone(), report)
            })
        })
        .collect()
}
