// THEORY:
// The `parallel_pipeline` module is the batch front end of the feature engine. A
// typical run scores many images against the same pretrained filter bank, so the
// bank is loaded once and shared by a fixed pool of workers.
//
// Key architectural principles:
// 1.  **One Dispatcher, Many Workers**: Jobs enter a single unbounded channel. A
//     dispatcher task hands them out round-robin to `workers` worker tasks, each
//     with its own channel.
// 2.  **Blocking Work Off The Runtime**: Extraction is pure CPU work. Each worker
//     runs it through `spawn_blocking`, so the async runtime stays responsive and
//     rayon's data parallelism inside one extraction is left untouched.
// 3.  **Reply Per Job**: Every job carries a `oneshot` sender for its own result.
//     A batch awaits all replies together and returns them in input order.
// 4.  **Orderly Shutdown**: Dropping the job sender closes the dispatcher, which
//     closes every worker channel; `shutdown` waits for all of them to drain.

use crate::core_modules::error::FeatureError;
use crate::core_modules::region::Segmentation;
use crate::pipeline::{RegionReport, SaliencyPipeline};
use futures::future::join_all;
use image::RgbImage;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Failure of one batch job.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error("worker pool is shut down")]
    PoolClosed,
    #[error("worker dropped job {job_id} before replying")]
    WorkerLost { job_id: u64 },
}

/// Batch settings.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of worker tasks; defaults to the number of logical CPUs.
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
        }
    }
}

/// One image and its segmentation.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub image: RgbImage,
    pub segmentation: Segmentation,
}

struct ExtractionTask {
    job_id: u64,
    job: ExtractionJob,
    result_sender: oneshot::Sender<Result<RegionReport, BatchError>>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<ExtractionTask>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    next_job_id: AtomicU64,
}

impl WorkerPool {
    /// Spawns the dispatcher and `workers` workers on the current tokio runtime.
    pub fn new(pipeline: Arc<SaliencyPipeline>, workers: usize) -> Self {
        let worker_count = workers.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<ExtractionTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<ExtractionTask>())
            .unzip();

        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    warn!("worker {worker_idx} is gone; job {} is dropped", task.job_id);
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        let workers = worker_receivers
            .into_iter()
            .enumerate()
            .map(|(worker_idx, mut worker_receiver)| {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    while let Some(task) = worker_receiver.recv().await {
                        let ExtractionTask {
                            job_id,
                            job,
                            result_sender,
                        } = task;
                        let started = Instant::now();
                        let pipeline = Arc::clone(&pipeline);
                        let result = tokio::task::spawn_blocking(move || {
                            pipeline.extract(&job.image, &job.segmentation)
                        })
                        .await;
                        debug!("worker {worker_idx} finished job {job_id} in {:?}", started.elapsed());

                        let reply = match result {
                            Ok(report) => report.map_err(BatchError::from),
                            Err(join_error) => {
                                warn!("job {job_id} panicked: {join_error}");
                                Err(BatchError::WorkerLost { job_id })
                            }
                        };
                        let _ = result_sender.send(reply);
                    }
                })
            })
            .collect();

        Self {
            task_sender,
            dispatcher,
            workers,
            next_job_id: AtomicU64::new(0),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queues one job and waits for its report.
    pub async fn extract(&self, job: ExtractionJob) -> Result<RegionReport, BatchError> {
        let job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let (result_sender, result_receiver) = oneshot::channel();

        self.task_sender
            .send(ExtractionTask {
                job_id,
                job,
                result_sender,
            })
            .map_err(|_| BatchError::PoolClosed)?;

        result_receiver
            .await
            .map_err(|_| BatchError::WorkerLost { job_id })?
    }

    /// Stops accepting jobs and waits for queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        if let Err(join_error) = self.dispatcher.await {
            warn!("dispatcher exited abnormally: {join_error}");
        }
        for worker in join_all(self.workers).await {
            if let Err(join_error) = worker {
                warn!("worker exited abnormally: {join_error}");
            }
        }
    }
}

/// Runs batches of images through one shared pipeline.
pub struct ParallelPipeline {
    config: BatchConfig,
    worker_pool: WorkerPool,
}

impl ParallelPipeline {
    pub fn new(pipeline: SaliencyPipeline, config: BatchConfig) -> Self {
        let worker_pool = WorkerPool::new(Arc::new(pipeline), config.workers);
        Self { config, worker_pool }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub async fn process(&self, job: ExtractionJob) -> Result<RegionReport, BatchError> {
        self.worker_pool.extract(job).await
    }

    /// Extracts every job concurrently; results come back in input order.
    pub async fn process_batch(&self, jobs: Vec<ExtractionJob>) -> Vec<Result<RegionReport, BatchError>> {
        let started = Instant::now();
        let job_count = jobs.len();
        let results = join_all(jobs.into_iter().map(|job| self.worker_pool.extract(job))).await;
        debug!("batch of {job_count} jobs finished in {:?}", started.elapsed());
        results
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}
