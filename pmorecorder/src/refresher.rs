//! Schedule refresh: pull every source and store the new programs

use pmoprogram::{
    CalendarDate, Clock, Program, ProgramPersistence, ProgramSource, Result, SaveOutcome,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters of one refresh cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub inserted: usize,
    pub already_present: usize,
}

impl RefreshReport {
    fn record(&mut self, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Inserted => self.inserted += 1,
            SaveOutcome::AlreadyPresent => self.already_present += 1,
        }
    }
}

pub struct Refresher {
    sources: Vec<Arc<dyn ProgramSource>>,
    persistence: Arc<dyn ProgramPersistence>,
    clock: Arc<dyn Clock>,
}

impl Refresher {
    pub fn new(
        sources: Vec<Arc<dyn ProgramSource>>,
        persistence: Arc<dyn ProgramPersistence>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sources,
            persistence,
            clock,
        }
    }

    /// Fetch today's schedule from every source and save each draft
    ///
    /// The first failing source aborts the cycle; programs saved before the
    /// failure stay stored. Saving is insert-if-absent, so repeating a
    /// refresh never duplicates a `(station, source_id)` pair.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let today = CalendarDate::today(self.clock.now());
        let mut report = RefreshReport::default();

        for source in &self.sources {
            let station = source.station();
            let drafts = source.fetch_schedule(today).await?;
            debug!(%station, drafts = drafts.len(), "schedule fetched");

            for draft in drafts {
                let outcome = self.persistence.save(&Program::ingest(draft)).await?;
                report.record(outcome);
            }
        }

        info!(
            inserted = report.inserted,
            already_present = report.already_present,
            "refresh finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}
