//! Capability traits implemented outside the recorder core
//!
//! - [`ProgramSource`]: one content provider (schedule discovery + capture)
//! - [`ProgramPersistence`]: the program store
//!
//! Both are object safe and meant to be shared as `Arc<dyn …>`.

use crate::config::RecorderConfig;
use crate::error::Result;
use crate::jst::CalendarDate;
use crate::model::{Program, ProgramDraft, SaveOutcome, Station, Status};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::fmt::Debug;
use std::time::Duration;

/// A content provider
///
/// Every provider is driven the same way; the core never special-cases
/// capture mechanics per station.
#[async_trait]
pub trait ProgramSource: Debug + Send + Sync {
    /// Station tag stamped on every draft this source returns
    fn station(&self) -> Station;

    /// Fetch the schedule for `date`
    ///
    /// Providers whose catalog is not date-scoped ignore `date` and return
    /// the full current catalog.
    ///
    /// # Errors
    ///
    /// `Transport`, `NonSuccessStatus` or `Decode`.
    async fn fetch_schedule(&self, date: CalendarDate) -> Result<Vec<ProgramDraft>>;

    /// Capture `program` into the archive
    ///
    /// Blocks for the real duration of the content (seconds to hours).
    ///
    /// # Errors
    ///
    /// `CaptureProcess` for any failure.
    async fn capture(&self, config: &RecorderConfig, program: &Program) -> Result<()>;
}

/// The program store
#[async_trait]
pub trait ProgramPersistence: Send + Sync {
    /// Insert if the natural key `(station, source_id)` is absent
    ///
    /// First write wins: a second save of the same key succeeds without
    /// touching the stored row.
    async fn save(&self, program: &Program) -> Result<SaveOutcome>;

    /// Up to `limit` on-demand programs still `Scheduled`
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches.
    async fn load_ondemand_scheduled(&self, limit: usize) -> Result<Vec<Program>>;

    /// Scheduled broadcasts with `start ∈ (now, now + window]`
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches.
    async fn load_broadcast_start_in(
        &self,
        now: DateTime<FixedOffset>,
        window: Duration,
    ) -> Result<Vec<Program>>;

    /// Set the status of the program identified by `program.id`
    ///
    /// No compare-and-swap is done; the single task owning the program is
    /// the only caller.
    ///
    /// # Errors
    ///
    /// `NotFound` if the identity is absent.
    async fn change_status(&self, program: &Program, new_status: Status) -> Result<()>;
}
