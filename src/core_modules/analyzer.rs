// THEORY:
// The `analyzer` module is the read-only reporting layer over the accumulator.
// It answers the questions a human asks after a handful of runs: how much of
// this image moves per run, is the moving set the same pixels every time, and
// when a pixel moves repeatedly, does it always move by the same amount?
//
// Key architectural principles:
// 1.  **Strictly read-only**: summaries are derived, never written back. The
//     analyzer takes a shared reference and the accumulator is bit-identical
//     afterwards.
// 2.  **Heuristics, labeled as such**: the randomness hint compares the union
//     of ever-changed pixels against the average per-run change count. It is
//     an approximation, not a statistical test, and its labels say "appears".
// 3.  **Classification over perPixel**: a pixel seen once is `single`; among
//     pixels seen more than once, exactly one recurring signed-delta pattern
//     means `stable`, more than one means `unstable`.

use crate::core_modules::history::HistoryAccumulator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `unionChanged` must exceed `avgChangedPerRun` by this factor before the
/// changing set is labeled random.
const RANDOMNESS_RATIO: f64 = 1.5;

pub const HINT_RANDOM: &str = "appears random";
pub const HINT_PARTLY_FIXED: &str = "appears partly fixed";

/// Per-image presentation summary derived from the accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    /// Number of runs this image participated in.
    pub runs_seen: u64,
    /// Mean changed-pixel count per run, 0 when no runs were seen.
    pub avg_changed_per_run: f64,
    /// Number of distinct pixels that ever changed.
    pub union_changed: u64,
    pub selection_randomness_hint: String,
    /// Pixels that changed in exactly one run.
    pub single: u64,
    /// Multi-change pixels whose every change had the same signed delta.
    pub stable: u64,
    /// Multi-change pixels with more than one distinct signed delta.
    pub unstable: u64,
    /// `100 * stable / (stable + unstable)`; `None` (JSON null) when the
    /// image has no multi-change pixels.
    pub pct_fixed_delta_among_multi: Option<f64>,
}

/// Derives per-image summaries from the accumulator. Read-only.
pub fn analyze(history: &HistoryAccumulator) -> BTreeMap<String, ImageSummary> {
    history
        .by_image
        .iter()
        .map(|(name, image)| {
            let runs_seen = image.per_run_changed.len() as u64;
            let avg_changed_per_run = if image.per_run_changed.is_empty() {
                0.0
            } else {
                image.per_run_changed.iter().sum::<u64>() as f64 / runs_seen as f64
            };
            let union_changed = image.ever_changed.len() as u64;

            let hint = if union_changed as f64 > avg_changed_per_run * RANDOMNESS_RATIO {
                HINT_RANDOM
            } else {
                HINT_PARTLY_FIXED
            };

            let mut single = 0u64;
            let mut stable = 0u64;
            let mut unstable = 0u64;
            for stat in image.per_pixel.values() {
                if stat.n == 1 {
                    single += 1;
                } else if stat.n > 1 {
                    if stat.patterns.len() == 1 {
                        stable += 1;
                    } else {
                        unstable += 1;
                    }
                }
            }

            let multi = stable + unstable;
            let pct_fixed_delta_among_multi =
                (multi > 0).then(|| 100.0 * stable as f64 / multi as f64);

            (
                name.clone(),
                ImageSummary {
                    runs_seen,
                    avg_changed_per_run,
                    union_changed,
                    selection_randomness_hint: hint.to_string(),
                    single,
                    stable,
                    unstable,
                    pct_fixed_delta_among_multi,
                },
            )
        })
        .collect()
}
