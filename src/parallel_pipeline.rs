// THEORY:
// One picture is always processed on one thread: its buffers share storage
// through non-atomic handles and the type system keeps them there. What *can*
// run in parallel is independent pictures. `ParallelPipeline` takes a list of
// jobs (an input bitmap plus optional outputs), and runs each job start to
// finish (decode, edge detection, encode) inside its own blocking task. Only
// paths go in and only plain summaries come out, so nothing that owns pixel
// storage ever crosses a thread.
//
// Concurrency is bounded by a semaphore sized to the number of CPUs unless the
// caller asks for something else. Results come back in job order.

use crate::core_modules::error::VisionError;
use crate::core_modules::grayscale::to_grayscale;
use crate::core_modules::picture::bitmap_codec;
use crate::pipeline::{EdgePipeline, PipelineConfig};
use futures::future::join_all;
use log::{debug, error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub input: PathBuf,
    /// Where to write the edge map as a bitmap, if anywhere.
    pub output: Option<PathBuf>,
    /// Where to write the intermediate grayscale image, if anywhere.
    pub grayscale_dump: Option<PathBuf>,
}

impl BatchJob {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            grayscale_dump: None,
        }
    }
}

/// What a finished job reports back.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub input: PathBuf,
    pub width: usize,
    pub height: usize,
    pub edge_pixels: usize,
    pub elapsed: Duration,
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Vision(#[from] VisionError),
    #[error("worker for {} stopped before finishing: {reason}", input.display())]
    Worker { input: PathBuf, reason: String },
}

pub struct ParallelPipeline {
    config: PipelineConfig,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl ParallelPipeline {
    /// `workers = None` uses one worker per logical CPU.
    pub fn new(config: PipelineConfig, workers: Option<usize>) -> Self {
        let workers = workers.unwrap_or_else(num_cpus::get).max(1);
        Self {
            config,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs every job and returns one result per job, in job order.
    pub async fn process(&self, jobs: Vec<BatchJob>) -> Vec<Result<BatchOutcome, BatchError>> {
        info!("processing {} picture(s) on up to {} worker(s)", jobs.len(), self.workers);

        let tasks = jobs.into_iter().map(|job| {
            let permits = Arc::clone(&self.permits);
            let config = self.config.clone();
            async move {
                let input = job.input.clone();
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| BatchError::Worker {
                        input: input.clone(),
                        reason: e.to_string(),
                    })?;
                tokio::task::spawn_blocking(move || run_job(&config, &job))
                    .await
                    .map_err(|e| BatchError::Worker {
                        input,
                        reason: e.to_string(),
                    })?
            }
        });

        let results = join_all(tasks).await;
        for result in &results {
            if let Err(e) = result {
                error!("{e}");
            }
        }
        results
    }
}

fn run_job(config: &PipelineConfig, job: &BatchJob) -> Result<BatchOutcome, BatchError> {
    debug!("starting {}", job.input.display());
    let picture = bitmap_codec::decode(&job.input)?;

    if let Some(path) = &job.grayscale_dump {
        bitmap_codec::encode_grayscale(path, picture.header(), &to_grayscale(&picture))?;
    }

    let report = EdgePipeline::new(config.clone()).generate_report(&picture)?;

    if let Some(path) = &job.output {
        bitmap_codec::encode_picture(path, &report.picture)?;
    }

    Ok(BatchOutcome {
        input: job.input.clone(),
        width: picture.width(),
        height: picture.height(),
        edge_pixels: report.edge_pixel_count(),
        elapsed: report.elapsed,
    })
}
