// THEORY:
// The `store` module is the persistence boundary of the accumulator. One store
// wraps one JSON document on disk and offers exactly the operations the
// outside world was promised: load, whole-document replace, reset, and the
// single-step load-merge-write.
//
// Key architectural principles:
// 1.  **Normalize on the way in, normalize on the way out**: every load runs
//     the defensive normalizer (corrupted files degrade, never fail), and
//     every persist normalizes again before encoding, so the document on disk
//     always satisfies the model invariants no matter what the caller held.
// 2.  **Replace, not patch**: writes go through a temp file in the same
//     directory followed by a rename, so readers only ever observe a complete
//     document. There is no field-level patching and no compare-and-swap;
//     concurrent writers from independent processes can still lose updates,
//     which is an accepted limitation of this design.

use crate::core_modules::history::{normalize, HistoryAccumulator};
use crate::core_modules::merge::{merge, RunDeltas};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File-backed storage for one `HistoryAccumulator` document.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the accumulator. An absent, unreadable, or corrupt document
    /// degrades to the empty accumulator rather than failing.
    pub fn load(&self) -> HistoryAccumulator {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return HistoryAccumulator::empty(),
        };
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => normalize(&value),
            Err(error) => {
                log::warn!(
                    "history document {} is not valid JSON ({error}); starting empty",
                    self.path.display()
                );
                HistoryAccumulator::empty()
            }
        }
    }

    /// Replaces the persisted document wholesale with the normalized form of
    /// `history`.
    pub fn persist(&self, history: &HistoryAccumulator) -> Result<()> {
        let canonical = normalize(&serde_json::to_value(history).context("encoding history")?);
        let json = serde_json::to_string(&canonical).context("encoding history")?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;

        log::debug!(
            "persisted history ({} run(s), {} image(s)) to {}",
            canonical.runs,
            canonical.by_image.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Resets the document to the empty accumulator. Called whenever a new
    /// baseline is established: history is only meaningful relative to one
    /// baseline.
    pub fn reset(&self) -> Result<()> {
        self.persist(&HistoryAccumulator::empty())
    }

    /// The single-step entry point: load, fold one run's deltas, write back.
    /// Produces exactly the accumulator a separate load + `merge` + `persist`
    /// sequence would.
    pub fn merge_and_persist(&self, run_deltas: &RunDeltas) -> Result<HistoryAccumulator> {
        let mut history = self.load();
        merge(&mut history, run_deltas);
        self.persist(&history)?;
        Ok(history)
    }
}
