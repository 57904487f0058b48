// This file is an example runner for the `drift_vision` library.
// The main library entry point is `src/lib.rs`.

use drift_vision::{DriftPipeline, HistoryStore, PixelBuffer, Report};
use std::collections::BTreeMap;

fn main() {
    let _ = flexi_logger::Logger::try_with_str("info").map(|logger| logger.start());

    println!("Drift Vision Engine - Example Runner");

    // In a real harness the rendering layer supplies these buffers and the
    // baseline comes from its own storage; here we synthesize a 2-pixel image
    // with a one-channel wobble.
    let baseline = BTreeMap::from([(
        "demo".to_string(),
        PixelBuffer::new(vec![10, 20, 30, 255, 40, 50, 60, 255]),
    )]);
    let current = BTreeMap::from([(
        "demo".to_string(),
        PixelBuffer::new(vec![10, 21, 30, 255, 40, 50, 60, 255]),
    )]);

    let store = HistoryStore::new(std::env::temp_dir().join("drift_vision_demo.json"));
    let mut pipeline = DriftPipeline::new(Default::default(), store.load());

    let run = pipeline.process_run(&baseline, &current);
    match &run.report {
        Report::NoDrift => println!("no drift detected"),
        Report::DriftDetected(data) => println!(
            "drift in {:?}: {} changed pixel(s)",
            data.changed_images, data.total_changed_pixels
        ),
    }

    for (name, summary) in pipeline.summaries() {
        println!(
            "{name}: {} run(s), union {} pixel(s), {}",
            summary.runs_seen, summary.union_changed, summary.selection_randomness_hint
        );
    }

    if let Err(error) = store.persist(pipeline.history()) {
        eprintln!("failed to persist history: {error:#}");
    }
}
