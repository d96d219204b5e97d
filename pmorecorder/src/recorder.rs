//! Recording orchestration
//!
//! [`Recorder`] owns the refresher, the executor and the in-flight
//! registry. Its two preparation paths launch detached tasks and return
//! their handles without awaiting them. Every launched task is tracked so
//! that shutdown can let running captures reach a terminal status.

use crate::executor::Executor;
use crate::inflight::InFlight;
use crate::refresher::{RefreshReport, Refresher};
use pmoprogram::{
    Clock, Program, ProgramId, ProgramPersistence, ProgramSource, RecorderConfig, Result, Status,
    SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, info_span, Instrument};

/// Handle on a launched recording
#[derive(Debug)]
pub struct RecordingTask {
    program_id: ProgramId,
    handle: JoinHandle<Status>,
}

impl RecordingTask {
    pub fn program_id(&self) -> ProgramId {
        self.program_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task and return the last persisted status
    pub async fn wait(self) -> std::result::Result<Status, JoinError> {
        self.handle.await
    }
}

/// Refresh and preparation entry points, shared by the periodic driver
pub struct Recorder {
    refresher: Refresher,
    executor: Arc<Executor>,
    persistence: Arc<dyn ProgramPersistence>,
    clock: Arc<dyn Clock>,
    in_flight: InFlight,
    tracker: TaskTracker,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("refresher", &self.refresher)
            .field("executor", &self.executor)
            .field("in_flight", &self.in_flight.len())
            .field("recordings", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

impl Recorder {
    pub fn builder(persistence: Arc<dyn ProgramPersistence>) -> RecorderBuilder {
        RecorderBuilder::new(persistence)
    }

    pub fn config(&self) -> &RecorderConfig {
        self.executor.config()
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Number of launched recordings that have not finished yet
    pub fn recordings_in_progress(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every launched recording has finished
    ///
    /// Call once the scheduler is stopped. Launches made after this call
    /// are still tracked, but the wait may return before they finish.
    pub async fn wait_recordings(&self) {
        self.tracker.close();
        if !self.tracker.is_empty() {
            info!(
                recordings = self.tracker.len(),
                "waiting for running recordings"
            );
        }
        self.tracker.wait().await;
    }

    /// One refresh cycle over every source
    pub async fn refresh(&self) -> Result<RefreshReport> {
        self.refresher.refresh().await
    }

    /// Launch up to `batch_size` scheduled on-demand programs
    ///
    /// Launches are separated by `stagger`; no delay follows the last one.
    pub async fn prepare_ondemand(
        &self,
        batch_size: usize,
        stagger: Duration,
    ) -> Result<Vec<RecordingTask>> {
        let programs = match self.persistence.load_ondemand_scheduled(batch_size).await {
            Err(err) if err.is_not_found() => {
                debug!("no on-demand program to record");
                return Ok(Vec::new());
            }
            other => other?,
        };

        let mut tasks = Vec::with_capacity(programs.len());
        for program in programs {
            if !tasks.is_empty() {
                tokio::time::sleep(stagger).await;
            }
            tasks.extend(self.launch(program));
        }
        Ok(tasks)
    }

    /// Launch every scheduled broadcast starting within `prepare_after`
    pub async fn prepare_broadcast(&self) -> Result<Vec<RecordingTask>> {
        let now = self.clock.now();
        let window = self.config().prepare_after;
        let programs = match self.persistence.load_broadcast_start_in(now, window).await {
            Err(err) if err.is_not_found() => {
                debug!("no broadcast to prepare");
                return Ok(Vec::new());
            }
            other => other?,
        };

        Ok(programs
            .into_iter()
            .filter_map(|program| self.launch(program))
            .collect())
    }

    /// Spawn the executor for `program` unless another task owns it
    fn launch(&self, program: Program) -> Option<RecordingTask> {
        let Some(claim) = self.in_flight.claim(program.id) else {
            debug!(program_id = %program.id, "already being recorded, skipped");
            return None;
        };

        let program_id = program.id;
        let span = info_span!(
            "recording",
            program_id = %program.id,
            station = %program.station,
            title = %program.title,
        );
        info!(parent: &span, stream_type = %program.stream_type, start = %program.start, "launching");

        let executor = Arc::clone(&self.executor);
        let handle = self.tracker.spawn(
            async move {
                let status = executor.run(program).await;
                drop(claim);
                status
            }
            .instrument(span),
        );

        Some(RecordingTask { program_id, handle })
    }
}

/// Builder for [`Recorder`]
pub struct RecorderBuilder {
    persistence: Arc<dyn ProgramPersistence>,
    sources: Vec<Arc<dyn ProgramSource>>,
    config: RecorderConfig,
    clock: Arc<dyn Clock>,
}

impl RecorderBuilder {
    pub fn new(persistence: Arc<dyn ProgramPersistence>) -> Self {
        Self {
            persistence,
            sources: Vec::new(),
            config: RecorderConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Add a source; refresh visits sources in insertion order
    pub fn source(mut self, source: Arc<dyn ProgramSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn config(mut self, config: RecorderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Recorder {
        let executor = Executor::new(
            Arc::clone(&self.persistence),
            self.sources.iter().cloned(),
            self.config,
            Arc::clone(&self.clock),
        );
        let refresher = Refresher::new(
            self.sources,
            Arc::clone(&self.persistence),
            Arc::clone(&self.clock),
        );

        Recorder {
            refresher,
            executor: Arc::new(executor),
            persistence: self.persistence,
            clock: self.clock,
            in_flight: InFlight::new(),
            tracker: TaskTracker::new(),
        }
    }
}
