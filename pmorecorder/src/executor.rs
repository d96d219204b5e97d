//! Per-program recording state machine
//!
//! `Scheduled → Recording → {Done | Failed}`. The task that moved a program
//! to `Recording` is the only writer of its status until it ends.

use chrono::Duration as ChronoDuration;
use pmoprogram::{
    Clock, Error, Program, ProgramPersistence, ProgramSource, RecorderConfig, Result, Station,
    Status, StreamType,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// One initial attempt plus three retries
pub const MAX_CAPTURE_ATTEMPTS: usize = 4;

/// Drives one program from `Scheduled` to a terminal status
pub struct Executor {
    persistence: Arc<dyn ProgramPersistence>,
    sources: HashMap<Station, Arc<dyn ProgramSource>>,
    config: RecorderConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(
        persistence: Arc<dyn ProgramPersistence>,
        sources: impl IntoIterator<Item = Arc<dyn ProgramSource>>,
        config: RecorderConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.station(), source))
            .collect();
        Self {
            persistence,
            sources,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Record `program` and return the last status that was persisted
    pub async fn run(&self, mut program: Program) -> Status {
        if let Err(err) = self.transition(&mut program, Status::Recording).await {
            error!("cannot start recording: {err}");
            return program.status;
        }

        let Some(source) = self.sources.get(&program.station).cloned() else {
            error!(station = %program.station, "no source configured for station");
            self.finish(&mut program, Status::Failed).await;
            return program.status;
        };

        if program.stream_type == StreamType::Broadcast {
            let wait = self.pre_start_wait(&program);
            debug!(?wait, "waiting for broadcast start");
            tokio::time::sleep(wait).await;
        }

        for attempt in 1..=MAX_CAPTURE_ATTEMPTS {
            match source.capture(&self.config, &program).await {
                Ok(()) => {
                    info!(attempt, "recording finished");
                    self.finish(&mut program, Status::Done).await;
                    return program.status;
                }
                Err(err) => warn!(attempt, "capture failed: {err}"),
            }
        }

        error!(attempts = MAX_CAPTURE_ATTEMPTS, "capture attempts exhausted");
        self.finish(&mut program, Status::Failed).await;
        program.status
    }

    /// `max(0, Start − Margin − now)`
    fn pre_start_wait(&self, program: &Program) -> Duration {
        let target = ChronoDuration::from_std(self.config.margin)
            .ok()
            .and_then(|margin| program.start.checked_sub_signed(margin))
            .unwrap_or(program.start);
        target
            .signed_duration_since(self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    async fn transition(&self, program: &mut Program, next: Status) -> Result<()> {
        if !program.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: program.status,
                to: next,
            });
        }
        self.persistence.change_status(program, next).await?;
        program.status = next;
        Ok(())
    }

    async fn finish(&self, program: &mut Program, terminal: Status) {
        if let Err(err) = self.transition(program, terminal).await {
            error!(status = %terminal, "cannot record final status: {err}");
        }
    }
}
