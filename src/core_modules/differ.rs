// THEORY:
// The `differ` module is the analytical heart of the engine's per-run stage. It
// compares two `PixelBuffer`s in a single pass and quantifies the difference
// between them through several parallel "lenses":
// - dense:   a 256-bin deviation histogram covering *every* pixel (bin 0 holds
//            the unchanged ones), from which a sparse percentage distribution
//            over the changed bins is derived at the end;
// - sparse:  a complete changed-map from pixel index to signed per-channel
//            delta, the one artifact the cross-run accumulator feeds on;
// - bounded: a first-N sample of fully detailed change records for inspection,
//            capped so a catastrophic diff cannot balloon a report.
//
// Key architectural principles:
// 1.  **Pure and total**: `diff` is a function of its arguments only. No I/O,
//     no side effects, no error conditions — degenerate inputs (empty buffers)
//     produce degenerate outputs (zero counts), never faults.
// 2.  **One loop, many accumulators**: every statistic is folded in the same
//     pass over the comparable pixel range. Only the deviation distribution is
//     computed afterwards, from the finished histogram.
// 3.  **Named policies over silent unification**: alpha-change counting exists
//     in two historical variants. Both are kept as explicit, selectable
//     policies; unifying them could silently shift reported statistics.

use crate::core_modules::pixel_buffer::pixel_buffer::{
    comparable_pixels, signed_delta, PixelBuffer, PixelIndex, Rgba, SignedDelta,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default cap on the number of detailed sample records in a report.
pub const DEFAULT_SAMPLE_CAP: usize = 50;

const HISTOGRAM_BINS: usize = 256;

/// Sparse map from pixel index to the signed per-channel delta observed there.
/// One entry per changed pixel, unbounded.
pub type ChangedMap = BTreeMap<PixelIndex, SignedDelta>;

/// How the `alpha_changes` counter decides that a pixel's alpha changed.
///
/// For 8-bit channels the two policies agree; they diverge only under
/// wraparound/sign edge cases, so both are preserved as distinct, named
/// variants rather than unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlphaPolicy {
    /// The absolute alpha delta is nonzero.
    #[default]
    AbsDeltaNonzero,
    /// The raw alpha bytes compare unequal.
    AnyInequality,
}

/// One fully detailed record of a single changed pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRecord {
    pub pixel_index: PixelIndex,
    #[serde(rename = "prevRGBA")]
    pub prev_rgba: Rgba,
    #[serde(rename = "currRGBA")]
    pub curr_rgba: Rgba,
    pub absolute_delta: [u8; 4],
    pub signed_delta: SignedDelta,
}

/// One bin of the sparse deviation distribution (deviations >= 1 only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviationShare {
    pub deviation: u8,
    /// Share of this bin among all changed pixels, in percent, 2 decimals.
    pub percent_of_changed_pixels: f64,
}

/// The complete result of comparing one pair of buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    /// Number of comparable pixels (shorter buffer, complete groups only).
    pub total_pixels: u64,
    /// Pixels where any channel differs.
    pub changed_pixels: u64,
    /// `changed_pixels / total_pixels`, 0 when there are no pixels.
    pub pct_changed: f64,
    /// Pixels whose alpha changed under the selected `AlphaPolicy`.
    pub alpha_changes: u64,
    /// Max over all pixels of the per-pixel max absolute channel delta.
    pub max_deviation: u8,
    /// Same, ignoring pixels whose local max is 255 or 254 (full-scale
    /// flips such as alpha toggles would otherwise drown the signal).
    pub max_deviation_excl: u8,
    /// Dense histogram indexed by per-pixel max deviation; bin 0 counts the
    /// unchanged pixels, so the bins always sum to `total_pixels`.
    pub deviation_histogram: Vec<u64>,
    pub deviation_distribution: Vec<DeviationShare>,
    /// First-N changed pixels in ascending index order, truncated at the cap.
    pub sample: Vec<SampleRecord>,
    pub changed_map: ChangedMap,
}

/// Compares two buffers under the default alpha policy. See
/// [`diff_with_policy`] for the full contract.
pub fn diff(prev: &PixelBuffer, curr: &PixelBuffer, sample_cap: usize) -> DiffReport {
    diff_with_policy(prev, curr, sample_cap, AlphaPolicy::default())
}

/// Compares two buffers pixel by pixel over their shorter common length.
///
/// Buffers of unequal length are compared over `min(len)` bytes with the
/// remainder silently ignored. Lengths not divisible by 4 are a caller
/// responsibility; the trailing partial group is never visited, but byte
/// misalignment between the two buffers is not detected.
pub fn diff_with_policy(
    prev: &PixelBuffer,
    curr: &PixelBuffer,
    sample_cap: usize,
    alpha_policy: AlphaPolicy,
) -> DiffReport {
    let total_pixels = comparable_pixels(prev, curr);

    let mut changed_pixels: u64 = 0;
    let mut alpha_changes: u64 = 0;
    let mut max_deviation: u8 = 0;
    let mut max_deviation_excl: u8 = 0;
    let mut deviation_histogram = vec![0u64; HISTOGRAM_BINS];
    let mut sample = Vec::new();
    let mut changed_map = ChangedMap::new();

    for index in 0..total_pixels as PixelIndex {
        let delta = signed_delta(prev, curr, index);
        let abs_delta = [
            delta[0].unsigned_abs() as u8,
            delta[1].unsigned_abs() as u8,
            delta[2].unsigned_abs() as u8,
            delta[3].unsigned_abs() as u8,
        ];
        let local_max = abs_delta.iter().copied().max().unwrap_or(0);

        deviation_histogram[local_max as usize] += 1;
        if local_max > max_deviation {
            max_deviation = local_max;
        }
        // 255/254 are full-scale or near-full-scale flips; keep them out of
        // the "typical deviation" signal.
        if local_max < 254 && local_max > max_deviation_excl {
            max_deviation_excl = local_max;
        }

        let alpha_changed = match alpha_policy {
            AlphaPolicy::AbsDeltaNonzero => abs_delta[3] != 0,
            AlphaPolicy::AnyInequality => prev.rgba(index)[3] != curr.rgba(index)[3],
        };
        if alpha_changed {
            alpha_changes += 1;
        }

        if local_max != 0 {
            changed_pixels += 1;
            changed_map.insert(index, delta);
            if sample.len() < sample_cap {
                sample.push(SampleRecord {
                    pixel_index: index,
                    prev_rgba: prev.rgba(index),
                    curr_rgba: curr.rgba(index),
                    absolute_delta: abs_delta,
                    signed_delta: delta,
                });
            }
        }
    }

    let pct_changed = if total_pixels == 0 {
        0.0
    } else {
        changed_pixels as f64 / total_pixels as f64
    };

    DiffReport {
        total_pixels: total_pixels as u64,
        changed_pixels,
        pct_changed,
        alpha_changes,
        max_deviation,
        max_deviation_excl,
        deviation_distribution: distribution_from_histogram(&deviation_histogram),
        deviation_histogram,
        sample,
        changed_map,
    }
}

/// Derives the sparse percentage distribution from a finished histogram.
/// Percentages are taken over the sum of bins >= 1 (the changed pixels).
fn distribution_from_histogram(histogram: &[u64]) -> Vec<DeviationShare> {
    let changed_total: u64 = histogram[1..].iter().sum();
    if changed_total == 0 {
        return Vec::new();
    }
    histogram[1..]
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(offset, &count)| DeviationShare {
            deviation: (offset + 1) as u8,
            percent_of_changed_pixels: round2(100.0 * count as f64 / changed_total as f64),
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
