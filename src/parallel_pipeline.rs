// THEORY:
// The `parallel_pipeline` module is the throughput-oriented variant of the
// comparison stage. A run over a large image set is embarrassingly parallel at
// the image level: every pair diffs independently, and only the final fold
// into the accumulator is order-sensitive. So the pool parallelizes exactly
// the diff step and leaves merging to the caller, single-threaded, where the
// synchronous and parallel paths provably agree.
//
// Structure: one dispatcher task round-robins incoming `DiffTask`s across a
// fixed set of worker tasks, each worker answers over a oneshot channel, and
// `compare_sets` collects the replies with `join_all`.

use crate::core_modules::differ::{diff_with_policy, DiffReport};
use crate::core_modules::pixel_buffer::pixel_buffer::PixelBuffer;
use crate::pipeline::{DriftPipelineConfig, ImageSet};
use std::collections::BTreeMap;
use tokio::sync::{mpsc, oneshot};

pub struct DiffTask {
    pub image_name: String,
    pub prev: PixelBuffer,
    pub curr: PixelBuffer,
    pub result_sender: oneshot::Sender<(String, DiffReport)>,
}

pub struct DiffWorkerPool {
    task_sender: mpsc::UnboundedSender<DiffTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl DiffWorkerPool {
    pub fn new(config: DriftPipelineConfig) -> Self {
        let pool_size = num_cpus::get().max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<DiffTask>();
        let mut workers = Vec::new();

        // Create a single dispatcher that distributes tasks to workers
        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..pool_size)
            .map(|_| mpsc::unbounded_channel::<DiffTask>())
            .unzip();

        // Spawn dispatcher
        let dispatcher_senders = worker_senders;
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = dispatcher_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % pool_size;
            }
        });

        // Spawn workers
        for mut worker_receiver in worker_receivers {
            let worker_config = config.clone();

            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let report = diff_with_policy(
                        &task.prev,
                        &task.curr,
                        worker_config.sample_cap,
                        worker_config.alpha_policy,
                    );
                    let _ = task.result_sender.send((task.image_name, report));
                }
            });

            workers.push(worker);
        }

        Self {
            task_sender,
            workers,
        }
    }

    pub fn submit(
        &self,
        image_name: String,
        prev: PixelBuffer,
        curr: PixelBuffer,
    ) -> Result<oneshot::Receiver<(String, DiffReport)>, &'static str> {
        let (result_sender, result_receiver) = oneshot::channel();
        let task = DiffTask {
            image_name,
            prev,
            curr,
            result_sender,
        };
        self.task_sender
            .send(task)
            .map_err(|_| "Failed to send task to worker pool")?;
        Ok(result_receiver)
    }
}

/// Diffs whole image sets across the worker pool.
pub struct ParallelDiffer {
    worker_pool: DiffWorkerPool,
}

impl ParallelDiffer {
    pub fn new(config: DriftPipelineConfig) -> Self {
        Self {
            worker_pool: DiffWorkerPool::new(config),
        }
    }

    /// Parallel counterpart of `pipeline::compare_sets`: same pairing rule,
    /// same pure diff per image, identical reports.
    pub async fn compare_sets(
        &self,
        baseline: &ImageSet,
        current: &ImageSet,
    ) -> Result<BTreeMap<String, DiffReport>, &'static str> {
        let mut receivers = Vec::new();
        for (name, curr) in current {
            if let Some(prev) = baseline.get(name) {
                receivers.push(self.worker_pool.submit(
                    name.clone(),
                    prev.clone(),
                    curr.clone(),
                )?);
            }
        }

        let mut reports = BTreeMap::new();
        for result in futures::future::join_all(receivers).await {
            let (name, report) = result.map_err(|_| "Failed to receive result from worker")?;
            reports.insert(name, report);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::compare_sets;

    fn set(entries: &[(&str, &[u8])]) -> ImageSet {
        entries
            .iter()
            .map(|(name, bytes)| (name.to_string(), PixelBuffer::new(bytes.to_vec())))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn parallel_reports_match_the_synchronous_path() {
        let baseline = set(&[
            ("a", &[0, 0, 0, 0, 1, 1, 1, 1]),
            ("b", &[10, 10, 10, 255]),
            ("c", &[7, 7, 7, 7]),
        ]);
        let current = set(&[
            ("a", &[0, 0, 0, 0, 1, 2, 1, 1]),
            ("b", &[10, 10, 10, 255]),
            ("c", &[7, 7, 7, 200]),
            ("extra", &[1, 2, 3, 4]),
        ]);

        let config = DriftPipelineConfig::default();
        let differ = ParallelDiffer::new(config.clone());
        let parallel = differ.compare_sets(&baseline, &current).await.unwrap();
        let sequential = compare_sets(&baseline, &current, &config);

        assert_eq!(parallel, sequential);
        assert!(!parallel.contains_key("extra"));
    }
}
