// crates/server/src/jobs/producer.rs
//! The producer seam: the long-running computation that emits measurement
//! records for one generation.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use trainview_core::{Generation, MeasurementRecord, RunConfig, TaggedRecord};

/// Errors a producer run can end with.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("Dataset not readable at {path}: {source}")]
    DatasetUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Record sink closed")]
    SinkClosed,

    #[error("Producer failed: {0}")]
    Failed(String),
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    Completed,
    Cancelled,
}

/// Channel a producer emits records into. Every record is tagged with the
/// generation the sink was created for.
#[derive(Debug, Clone)]
pub struct RecordSink {
    generation: Generation,
    tx: mpsc::Sender<TaggedRecord>,
}

impl RecordSink {
    pub fn new(generation: Generation, tx: mpsc::Sender<TaggedRecord>) -> Self {
        Self { generation, tx }
    }

    pub async fn emit(&self, record: MeasurementRecord) -> Result<(), ProducerError> {
        self.tx
            .send(TaggedRecord {
                generation: self.generation,
                record,
            })
            .await
            .map_err(|_| ProducerError::SinkClosed)
    }
}

/// Everything a producer needs for one run.
pub struct ProducerRun {
    pub generation: Generation,
    pub cancel: CancellationToken,
    pub config: RunConfig,
    pub sink: RecordSink,
}

/// A long-running computation that reports progress.
///
/// Implementations must check `run.cancel` at least once per step and stop
/// promptly once it is raised.
#[async_trait]
pub trait Producer: Send + Sync + 'static {
    async fn run(&self, run: ProducerRun) -> Result<RunEnd, ProducerError>;
}

/// Stand-in trainer that emits a plausible learning curve.
///
/// Loss falls linearly from 0.5 towards 0 and accuracy rises towards 1,
/// both with ±0.05 uniform noise, one record per epoch.
pub struct SyntheticProducer {
    step_delay: Duration,
}

impl SyntheticProducer {
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

impl Default for SyntheticProducer {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl Producer for SyntheticProducer {
    async fn run(&self, run: ProducerRun) -> Result<RunEnd, ProducerError> {
        let ProducerRun {
            generation,
            cancel,
            config,
            sink,
        } = run;

        tokio::fs::metadata(&config.dataset_path)
            .await
            .map_err(|source| ProducerError::DatasetUnavailable {
                path: config.dataset_path.clone(),
                source,
            })?;

        tracing::info!(
            generation = %generation,
            model = config.model.model_id(),
            optimizer = %config.optimizer,
            epochs = config.epochs,
            batch_size = config.batch_size,
            learning_rate = config.learning_rate,
            dataset = %config.dataset_path.display(),
            "Synthetic training started"
        );

        let epochs = config.epochs.max(1);
        for epoch in 1..=epochs {
            if cancel.is_cancelled() {
                return Ok(RunEnd::Cancelled);
            }

            let (loss, accuracy) = synthetic_step(epoch, epochs);
            tracing::debug!(generation = %generation, epoch, loss, accuracy, "Epoch finished");
            sink.emit(MeasurementRecord::new(epoch, loss, accuracy)).await?;

            tokio::select! {
                _ = cancel.cancelled() => return Ok(RunEnd::Cancelled),
                _ = tokio::time::sleep(self.step_delay) => {}
            }
        }

        Ok(RunEnd::Completed)
    }
}

fn synthetic_step(epoch: u32, epochs: u32) -> (f64, f64) {
    let mut rng = rand::thread_rng();
    let progress = f64::from(epoch) / f64::from(epochs);
    let loss = (0.5 - progress / 2.0 + rng.gen_range(-0.05..0.05)).max(0.0);
    let accuracy = (progress + rng.gen_range(-0.05..0.05)).min(1.0);
    (loss, accuracy)
}
