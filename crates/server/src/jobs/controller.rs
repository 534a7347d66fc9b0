// crates/server/src/jobs/controller.rs
//! Single-flight controller for the training job.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use trainview_core::{
    ConfigError, EventWatcher, Generation, RunConfig, StreamMessage, TaggedRecord, TrainingConfig,
    TrainingSummary,
};

use super::producer::{Producer, ProducerError, ProducerRun, RecordSink, RunEnd};
use super::types::{ControlOutcome, Forwarded, JobState, JobStatus};
use crate::hub::Broadcaster;

/// Records a producer may have in flight before it waits on the forwarder.
const RECORD_BUFFER: usize = 32;

/// Sentinel for "no current generation" in the atomic.
const NO_GENERATION: u64 = 0;

struct Lifecycle {
    state: JobState,
    last_generation: Generation,
    cancel: Option<CancellationToken>,
}

/// Owns the lifecycle of the background producer.
///
/// At most one generation is active at a time. Every record a run emits is
/// checked against the current generation before it reaches observers or
/// the watcher, so output from a stopped or superseded run is dropped even
/// if the producer is slow to notice its cancellation.
pub struct JobController {
    lifecycle: Mutex<Lifecycle>,
    /// Mirror of the active generation, read at every emission point.
    current: AtomicU64,
    watcher: Mutex<EventWatcher>,
    broadcaster: Arc<Broadcaster>,
    producer: Arc<dyn Producer>,
}

impl JobController {
    pub fn new(broadcaster: Arc<Broadcaster>, producer: Arc<dyn Producer>) -> Arc<Self> {
        Arc::new(Self {
            lifecycle: Mutex::new(Lifecycle {
                state: JobState::Idle,
                last_generation: Generation(NO_GENERATION),
                cancel: None,
            }),
            current: AtomicU64::new(NO_GENERATION),
            watcher: Mutex::new(EventWatcher::new()),
            broadcaster,
            producer,
        })
    }

    /// Start a run unless one is already active.
    ///
    /// Configuration problems are reported before anything is spawned and
    /// leave the controller idle.
    pub fn start(self: &Arc<Self>, config: &TrainingConfig) -> Result<ControlOutcome, ConfigError> {
        let mut lifecycle = self.lock_lifecycle();
        if let Some(generation) = lifecycle.state.generation() {
            tracing::info!(generation = %generation, "Start ignored, training already running");
            return Ok(ControlOutcome::rejected("Training already running."));
        }
        let run_config = config.validate().inspect_err(|e| {
            tracing::warn!(error = %e, "Start rejected, configuration incomplete");
        })?;
        let generation = self.launch(&mut lifecycle, run_config);
        tracing::info!(generation = %generation, "Training started");
        Ok(ControlOutcome::ok("Training started."))
    }

    /// Cancel the active run. The caller sees `Idle` immediately.
    pub fn stop(&self) -> ControlOutcome {
        let mut lifecycle = self.lock_lifecycle();
        match self.retire(&mut lifecycle) {
            Some(generation) => {
                lifecycle.state = JobState::Idle;
                tracing::info!(generation = %generation, "Training stopped");
                ControlOutcome::ok("Training stopped.")
            }
            None => {
                tracing::debug!("Stop ignored, training not running");
                ControlOutcome::ok("Training is not running.")
            }
        }
    }

    /// Retire the active run (if any) and start a new one in a single step.
    ///
    /// Behaves as `stop()` followed by `start()`: the current run is retired
    /// before the new configuration is validated, so a rejected draft leaves
    /// the controller idle.
    pub fn restart(self: &Arc<Self>, config: &TrainingConfig) -> Result<ControlOutcome, ConfigError> {
        let mut lifecycle = self.lock_lifecycle();
        let previous = self.retire(&mut lifecycle);
        let run_config = match config.validate() {
            Ok(run_config) => run_config,
            Err(e) => {
                lifecycle.state = JobState::Idle;
                tracing::warn!(previous = ?previous, error = %e, "Restart rejected, configuration incomplete");
                return Err(e);
            }
        };
        if let Some(old) = previous {
            lifecycle.state = JobState::Cancelling(old);
        }
        let generation = self.launch(&mut lifecycle, run_config);
        tracing::info!(previous = ?previous, generation = %generation, "Training restarted");
        Ok(ControlOutcome::ok("Training restarted."))
    }

    /// Cancel any active run ahead of process exit.
    pub fn shutdown(&self) {
        let mut lifecycle = self.lock_lifecycle();
        if let Some(generation) = self.retire(&mut lifecycle) {
            tracing::info!(generation = %generation, "Training cancelled for shutdown");
        }
        lifecycle.state = JobState::Idle;
    }

    pub fn state(&self) -> JobState {
        self.lock_lifecycle().state
    }

    /// Generation whose records are currently accepted.
    pub fn current_generation(&self) -> Option<Generation> {
        match self.current.load(Ordering::Acquire) {
            NO_GENERATION => None,
            g => Some(Generation(g)),
        }
    }

    pub fn status(&self) -> JobStatus {
        let state = self.state();
        JobStatus {
            state: state.as_str(),
            generation: state.generation(),
            sessions: self.broadcaster.registry().len(),
        }
    }

    pub fn summary(&self) -> TrainingSummary {
        self.lock_watcher().summary()
    }

    /// Forwarding boundary: broadcast a record and any advisory it triggers,
    /// unless its generation has been superseded.
    ///
    /// The watcher lock is held from the generation check through the last
    /// broadcast. `retire` and `launch` switch the current generation under
    /// the same lock, so once `stop()` or `restart()` returns no frame from
    /// the retired generation can reach an observer.
    pub fn forward(&self, tagged: TaggedRecord) -> Forwarded {
        let TaggedRecord { generation, record } = tagged;
        let mut watcher = self.lock_watcher();
        if !self.is_current(generation) {
            tracing::debug!(generation = %generation, epoch = record.epoch, "Dropping record from stale generation");
            crate::metrics::record_stale_drop();
            return Forwarded::Stale;
        }

        self.broadcaster.broadcast(&StreamMessage::Metrics(record.clone()));
        crate::metrics::record_forwarded();

        watcher.begin_generation(generation);
        let Some(notice) = watcher.observe(&record) else {
            return Forwarded::Delivered { tip: false };
        };
        crate::metrics::record_notice(notice.severity);
        tracing::info!(
            generation = %generation,
            severity = %notice.severity,
            content = %notice.content,
            "Sending advisory"
        );
        self.broadcaster.broadcast(&StreamMessage::Tip(notice));
        Forwarded::Delivered { tip: true }
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.current.load(Ordering::Acquire) == generation.0
    }

    /// Switch the accepted generation. Waits for any in-flight `forward`.
    fn set_current(&self, value: u64) {
        let _watcher = self.lock_watcher();
        self.current.store(value, Ordering::Release);
    }

    fn lock_watcher(&self) -> std::sync::MutexGuard<'_, EventWatcher> {
        self.watcher.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Mutex poisoned on event watcher, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Mutex poisoned on job lifecycle, recovering");
            poisoned.into_inner()
        })
    }

    /// Raise cancellation for the active generation and stop accepting its
    /// records. Returns the retired generation.
    fn retire(&self, lifecycle: &mut Lifecycle) -> Option<Generation> {
        let generation = lifecycle.state.generation()?;
        if let Some(cancel) = lifecycle.cancel.take() {
            cancel.cancel();
        }
        self.set_current(NO_GENERATION);
        Some(generation)
    }

    fn launch(self: &Arc<Self>, lifecycle: &mut Lifecycle, config: RunConfig) -> Generation {
        let generation = lifecycle.last_generation.next();
        let cancel = CancellationToken::new();
        lifecycle.last_generation = generation;
        lifecycle.state = JobState::Running(generation);
        lifecycle.cancel = Some(cancel.clone());
        self.set_current(generation.0);

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.drive(generation, cancel, config).await;
        });
        generation
    }

    /// Run one generation of the producer and pump its records through
    /// [`forward`](Self::forward) until it ends.
    async fn drive(self: Arc<Self>, generation: Generation, cancel: CancellationToken, config: RunConfig) {
        let (tx, mut rx) = mpsc::channel(RECORD_BUFFER);
        let producer = Arc::clone(&self.producer);
        let run = ProducerRun {
            generation,
            cancel,
            config,
            sink: RecordSink::new(generation, tx),
        };
        let producing = tokio::spawn(async move { producer.run(run).await });

        while let Some(tagged) = rx.recv().await {
            self.forward(tagged);
        }

        let result = match producing.await {
            Ok(result) => result,
            Err(e) => Err(ProducerError::Failed(format!("producer task panicked: {e}"))),
        };
        match &result {
            Ok(RunEnd::Completed) => {
                tracing::info!(generation = %generation, "Training complete");
                crate::metrics::record_run("completed");
            }
            Ok(RunEnd::Cancelled) => {
                tracing::info!(generation = %generation, "Training run cancelled");
                crate::metrics::record_run("cancelled");
            }
            Err(e) => {
                tracing::error!(generation = %generation, error = %e, "Training run failed");
                crate::metrics::record_run("failed");
            }
        }
        self.finish(generation);
    }

    /// Return to `Idle` if `generation` is still the active run.
    fn finish(&self, generation: Generation) {
        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.state == JobState::Running(generation) {
            lifecycle.state = JobState::Idle;
            lifecycle.cancel = None;
            self.set_current(NO_GENERATION);
            tracing::debug!(generation = %generation, "Controller idle");
        }
    }
}
