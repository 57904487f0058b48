use drift_vision::{
    merge, ChangedMap, DriftPipeline, HistoryAccumulator, HistoryStore, PixelBuffer, Report,
    RunDeltas,
};
use std::collections::BTreeMap;

fn image_set(entries: &[(&str, &[u8])]) -> BTreeMap<String, PixelBuffer> {
    entries
        .iter()
        .map(|(name, bytes)| (name.to_string(), PixelBuffer::new(bytes.to_vec())))
        .collect()
}

fn store(name: &str) -> HistoryStore {
    let path = std::env::temp_dir().join(format!("drift_vision_it_{name}.json"));
    let _ = std::fs::remove_file(&path);
    HistoryStore::new(path)
}

#[test]
fn full_cycle_diff_merge_persist_reload_analyze() {
    let store = store("full_cycle");

    let baseline = image_set(&[
        ("solid", &[10, 10, 10, 255, 10, 10, 10, 255]),
        ("wobbly", &[0, 0, 0, 255, 0, 0, 0, 255]),
    ]);
    let run1 = image_set(&[
        ("solid", &[10, 10, 10, 255, 10, 10, 10, 255]),
        ("wobbly", &[1, 0, 0, 255, 0, 0, 0, 255]),
    ]);
    let run2 = image_set(&[
        ("solid", &[10, 10, 10, 255, 10, 10, 10, 255]),
        ("wobbly", &[1, 0, 0, 255, 0, 0, 0, 255]),
    ]);

    // Run 1.
    let mut pipeline = DriftPipeline::new(Default::default(), store.load());
    let report = pipeline.process_run(&baseline, &run1);
    assert!(matches!(report.report, Report::DriftDetected(_)));
    store.persist(pipeline.history()).unwrap();

    // Run 2 starts from the reloaded document, the way a fresh process would.
    let mut pipeline = DriftPipeline::new(Default::default(), store.load());
    pipeline.process_run(&baseline, &run2);
    store.persist(pipeline.history()).unwrap();

    let history = store.load();
    assert_eq!(history.runs, 2);
    assert_eq!(history.by_image["solid"].per_run_changed, vec![0, 0]);
    assert_eq!(history.by_image["wobbly"].per_run_changed, vec![1, 1]);

    // The same red +1 both runs: one pattern, counted twice.
    let stat = &history.by_image["wobbly"].per_pixel[&0];
    assert_eq!(stat.n, 2);
    assert_eq!(stat.patterns.len(), 1);
    assert_eq!(stat.patterns["1,0,0,0"], 2);

    let summaries = drift_vision::analyze(&history);
    assert_eq!(summaries["wobbly"].stable, 1);
    assert_eq!(summaries["wobbly"].unstable, 0);
    assert_eq!(summaries["wobbly"].pct_fixed_delta_among_multi, Some(100.0));
    assert_eq!(summaries["solid"].union_changed, 0);

    let _ = std::fs::remove_file(store.path());
}

#[test]
fn diverging_deltas_classify_as_unstable_after_reload() {
    let store = store("unstable");

    let deltas_a: RunDeltas = BTreeMap::from([(
        "img".to_string(),
        ChangedMap::from([(5u32, [1i16, 0, 0, 0])]),
    )]);
    let deltas_b: RunDeltas = BTreeMap::from([(
        "img".to_string(),
        ChangedMap::from([(5u32, [0i16, 1, 0, 0])]),
    )]);

    store.merge_and_persist(&deltas_a).unwrap();
    store.merge_and_persist(&deltas_b).unwrap();

    let history = store.load();
    assert_eq!(history.runs, 2);
    let stat = &history.by_image["img"].per_pixel[&5];
    assert_eq!(stat.n, 2);
    assert_eq!(stat.patterns["1,0,0,0"], 1);
    assert_eq!(stat.patterns["0,1,0,0"], 1);

    let summaries = drift_vision::analyze(&history);
    assert_eq!(summaries["img"].unstable, 1);
    assert_eq!(summaries["img"].pct_fixed_delta_among_multi, Some(0.0));

    let _ = std::fs::remove_file(store.path());
}

#[test]
fn replayed_deltas_equal_immediate_merging() {
    // Fold the runs immediately...
    let mut immediate = HistoryAccumulator::empty();
    let runs: Vec<RunDeltas> = vec![
        BTreeMap::from([(
            "img".to_string(),
            ChangedMap::from([(0u32, [1i16, 0, 0, 0]), (3u32, [0i16, 0, 0, -2])]),
        )]),
        BTreeMap::from([("img".to_string(), ChangedMap::new())]),
        BTreeMap::from([(
            "img".to_string(),
            ChangedMap::from([(3u32, [0i16, 0, 0, -2])]),
        )]),
    ];
    for run in &runs {
        merge(&mut immediate, run);
    }

    // ...and replay the same recorded changed-maps later.
    let mut replayed = HistoryAccumulator::empty();
    for run in &runs {
        merge(&mut replayed, run);
    }

    assert_eq!(immediate, replayed);
    assert_eq!(immediate.runs, 3);
}

#[test]
fn reset_on_new_baseline_discards_history() {
    let store = store("new_baseline");
    store
        .merge_and_persist(&BTreeMap::from([(
            "img".to_string(),
            ChangedMap::from([(0u32, [9i16, 0, 0, 0])]),
        )]))
        .unwrap();
    assert_eq!(store.load().runs, 1);

    // Committing a new baseline resets the accumulator.
    store.reset().unwrap();
    assert_eq!(store.load(), HistoryAccumulator::empty());

    let _ = std::fs::remove_file(store.path());
}
