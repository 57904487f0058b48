use drift_vision::{diff, merge, normalize, ChangedMap, HistoryAccumulator, PixelBuffer, RunDeltas};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Arbitrary JSON values, biased toward shapes that look almost like a
/// persisted accumulator so the normalizer's entry isolation gets exercised.
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>().prop_filter("finite", |f| f.is_finite()).prop_map(|f| json!(f)),
        "[a-z0-9,.-]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z0-9]{0,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_run_deltas() -> impl Strategy<Value = RunDeltas> {
    prop::collection::btree_map(
        "[a-z]{1,6}",
        prop::collection::btree_map(0u32..512, proptest::array::uniform4(-255i16..=255), 0..8)
            .prop_map(|m| m.into_iter().collect::<ChangedMap>()),
        0..4,
    )
}

proptest! {
    #[test]
    fn normalization_is_idempotent(candidate in arb_json()) {
        let once = normalize(&candidate);
        let twice = normalize(&serde_json::to_value(&once).unwrap());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalization_never_panics_and_round_trips_through_json(candidate in arb_json()) {
        let normalized = normalize(&candidate);
        let encoded = serde_json::to_string(&normalized).unwrap();
        let decoded: HistoryAccumulator = serde_json::from_str(&encoded).unwrap();
        prop_assert_eq!(decoded, normalized);
    }

    #[test]
    fn histogram_bins_sum_to_total_pixels(
        prev in prop::collection::vec(any::<u8>(), 0..256),
        curr in prop::collection::vec(any::<u8>(), 0..256),
        cap in 0usize..8,
    ) {
        let report = diff(&PixelBuffer::new(prev), &PixelBuffer::new(curr), cap);
        prop_assert_eq!(report.deviation_histogram.iter().sum::<u64>(), report.total_pixels);
        prop_assert_eq!(report.changed_map.len() as u64, report.changed_pixels);
        prop_assert!(report.sample.len() as u64 <= report.changed_pixels.min(cap as u64));
        for delta in report.changed_map.values() {
            prop_assert!(delta.iter().any(|&d| d != 0));
        }
    }

    #[test]
    fn merge_preserves_conservation_invariants(runs in prop::collection::vec(arb_run_deltas(), 0..6)) {
        let mut history = HistoryAccumulator::empty();
        for run in &runs {
            merge(&mut history, run);
        }

        prop_assert_eq!(history.runs, runs.len() as u64);
        for image in history.by_image.values() {
            for (pixel, stat) in &image.per_pixel {
                prop_assert!(image.ever_changed.contains(pixel));
                prop_assert_eq!(stat.patterns.values().sum::<u64>(), stat.n);
            }
        }
    }

    #[test]
    fn merged_accumulators_survive_persistence_normalization(runs in prop::collection::vec(arb_run_deltas(), 0..4)) {
        let mut history = HistoryAccumulator::empty();
        for run in &runs {
            merge(&mut history, run);
        }
        // The pre-write normalization pass must be a no-op on reducer output.
        let normalized = normalize(&serde_json::to_value(&history).unwrap());
        prop_assert_eq!(normalized, history);
    }
}

#[test]
fn recurring_and_diverging_deltas_build_the_expected_patterns() {
    // Deterministic companion to the properties above.
    let fixed: RunDeltas = BTreeMap::from([(
        "img".to_string(),
        ChangedMap::from([(5u32, [1i16, 0, 0, 0])]),
    )]);
    let shifted: RunDeltas = BTreeMap::from([(
        "img".to_string(),
        ChangedMap::from([(5u32, [0i16, 1, 0, 0])]),
    )]);

    let mut stable = HistoryAccumulator::empty();
    merge(&mut stable, &fixed);
    merge(&mut stable, &fixed);
    assert_eq!(stable.by_image["img"].per_pixel[&5].patterns["1,0,0,0"], 2);

    let mut unstable = HistoryAccumulator::empty();
    merge(&mut unstable, &fixed);
    merge(&mut unstable, &shifted);
    assert_eq!(unstable.by_image["img"].per_pixel[&5].patterns.len(), 2);
}
