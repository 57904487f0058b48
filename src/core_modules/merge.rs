// THEORY:
// The `merge` module is the append/fold step that turns one run's sparse diff
// output into durable cross-run knowledge. One call covers one real run, which
// may span many images; the run counter moves exactly once per call no matter
// how many images the run touched.
//
// Key architectural principles:
// 1.  **Fold, not transaction**: the reducer mutates the loaded accumulator in
//     place and is deliberately not idempotent — replaying the same run's
//     deltas double-counts. At-most-once application per real run is the
//     integrator's contract, enforced by the surrounding persistence flow,
//     never in here.
// 2.  **Replay equivalence**: whether deltas are merged immediately after a
//     diff or replayed later from recorded changed-maps, the resulting
//     accumulator is identical. The reducer only ever sees changed-maps.
// 3.  **Invariants by construction**: every pixel occurrence increments both
//     `n` and exactly one pattern counter, so `sum(patterns) == n` holds after
//     any sequence of merges; every changed pixel lands in `everChanged`, so
//     it always covers `perPixel`'s key set.

use crate::core_modules::differ::ChangedMap;
use crate::core_modules::history::{pattern_key, HistoryAccumulator};
use std::collections::BTreeMap;

/// One run's sparse deltas: image name -> that image's changed-map.
pub type RunDeltas = BTreeMap<String, ChangedMap>;

/// Folds one run's deltas into the accumulator.
///
/// Precondition: changed-map keys are genuine pixel indices. Malformed keys
/// that coerced to the same index upstream will merge into one entry here;
/// pre-validation is the caller's responsibility.
pub fn merge(history: &mut HistoryAccumulator, run_deltas: &RunDeltas) {
    history.runs += 1;

    for (image_name, changed_map) in run_deltas {
        let image = history.by_image.entry(image_name.clone()).or_default();

        image.per_run_changed.push(changed_map.len() as u64);

        for (&pixel_index, delta) in changed_map {
            image.ever_changed.insert(pixel_index);

            let stat = image.per_pixel.entry(pixel_index).or_default();
            stat.n += 1;
            *stat.patterns.entry(pattern_key(delta)).or_insert(0) += 1;
        }
    }
}
