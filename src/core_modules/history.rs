// THEORY:
// The `history` module defines the canonical cross-run accumulator — the one
// structure this engine persists — together with the defensive normalizer that
// guards every road into and out of persistence.
//
// Key architectural principles:
// 1.  **One canonical shape**: `HistoryAccumulator` is both the in-memory model
//     and (via serde) the exact wire/file JSON shape other tooling consumes:
//     `{"runs": n, "byImage": {name: {"perRunChanged": [...], "everChanged":
//     [...], "perPixel": {index: {"n": n, "patterns": {"dr,dg,db,da": n}}}}}}`.
// 2.  **Total, defensive coercion**: `normalize` maps *any* JSON value into
//     that shape and never fails. Degradation happens at the smallest possible
//     granularity — a corrupt pixel stat costs that pixel, never the image,
//     never the document. It runs on every load (corrupted files) and again
//     immediately before every write (malformed callers), so persisted state
//     always satisfies the model invariants.
// 3.  **Pattern keys are opaque here**: the canonical "dr,dg,db,da" key is
//     derived exactly once, at merge time. The normalizer carries existing
//     keys verbatim and never re-derives them.

use crate::core_modules::pixel_buffer::pixel_buffer::{PixelIndex, SignedDelta};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// The persisted cross-run accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAccumulator {
    /// Total number of merged runs.
    pub runs: u64,
    /// Per-image change history, keyed by image name.
    pub by_image: BTreeMap<String, ImageHistory>,
}

/// The accumulated change history of one image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageHistory {
    /// One entry per run this image participated in: that run's changed-pixel
    /// count. Images introduced after run 1 have shorter sequences than
    /// `runs`; that asymmetry is intentional and is never padded away.
    pub per_run_changed: Vec<u64>,
    /// Every pixel index that changed in at least one run.
    pub ever_changed: BTreeSet<PixelIndex>,
    /// Per-pixel occurrence and pattern statistics.
    pub per_pixel: BTreeMap<PixelIndex, PixelStat>,
}

/// Change statistics for one pixel of one image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelStat {
    /// Number of runs in which this pixel changed.
    pub n: u64,
    /// Count of runs per exact signed-delta pattern, keyed by the canonical
    /// "dr,dg,db,da" string. Values always sum to `n`.
    pub patterns: BTreeMap<String, u64>,
}

impl HistoryAccumulator {
    /// The accumulator a fresh (or just-reset) baseline starts from.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// The canonical string form of a signed-delta pattern.
pub fn pattern_key(delta: &SignedDelta) -> String {
    format!("{},{},{},{}", delta[0], delta[1], delta[2], delta[3])
}

/// Coerces an arbitrary JSON value into the canonical accumulator shape.
///
/// Total function: never fails, never panics. Malformed input degrades to the
/// nearest well-formed default, one field or entry at a time.
pub fn normalize(candidate: &Value) -> HistoryAccumulator {
    let Some(root) = candidate.as_object() else {
        return HistoryAccumulator::empty();
    };

    let mut by_image = BTreeMap::new();
    if let Some(images) = root.get("byImage").and_then(Value::as_object) {
        for (name, entry) in images {
            by_image.insert(name.clone(), normalize_image(entry));
        }
    }

    HistoryAccumulator {
        runs: coerce_count(root.get("runs")),
        by_image,
    }
}

fn normalize_image(entry: &Value) -> ImageHistory {
    let Some(image) = entry.as_object() else {
        return ImageHistory::default();
    };

    let per_run_changed = match image.get("perRunChanged").and_then(Value::as_array) {
        // Elements are coerced in place, never dropped: run order is data.
        Some(values) => values.iter().map(|v| coerce_count(Some(v))).collect(),
        None => Vec::new(),
    };

    let ever_changed = match image.get("everChanged").and_then(Value::as_array) {
        Some(values) => values
            .iter()
            .map(|v| coerce_count(Some(v)) as PixelIndex)
            .collect(),
        None => BTreeSet::new(),
    };

    let mut per_pixel = BTreeMap::new();
    if let Some(pixels) = image.get("perPixel").and_then(Value::as_object) {
        for (key, stat) in pixels {
            // Non-numeric keys coerce to 0 and may collapse together.
            per_pixel.insert(coerce_key(key), normalize_pixel_stat(stat));
        }
    }

    ImageHistory {
        per_run_changed,
        ever_changed,
        per_pixel,
    }
}

fn normalize_pixel_stat(stat: &Value) -> PixelStat {
    let Some(stat) = stat.as_object() else {
        return PixelStat::default();
    };

    let mut patterns = BTreeMap::new();
    if let Some(entries) = stat.get("patterns").and_then(Value::as_object) {
        for (key, count) in entries {
            // Keys are the canonical delta strings, carried verbatim.
            patterns.insert(key.clone(), coerce_count(Some(count)));
        }
    }

    PixelStat {
        n: coerce_count(stat.get("n")),
        patterns,
    }
}

/// Numeric coercion for counts: numbers and numeric strings pass through
/// (clamped at zero), everything else becomes 0.
fn coerce_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(number)) => {
            if let Some(n) = number.as_u64() {
                n
            } else {
                number.as_f64().filter(|f| f.is_finite() && *f > 0.0).map_or(0, |f| f as u64)
            }
        }
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f > 0.0)
            .map_or(0, |f| f as u64),
        _ => 0,
    }
}

fn coerce_key(key: &str) -> PixelIndex {
    coerce_count(Some(&Value::String(key.to_string()))) as PixelIndex
}
