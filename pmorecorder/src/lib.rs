//! # PMORecorder core
//!
//! Lifecycle of recorded programs, independent of any provider:
//!
//! - [`Refresher`]: pulls every source and stores new programs
//! - [`Recorder`]: the ondemand and broadcast preparation paths
//! - [`Executor`]: the per-program `Scheduled → Recording → Done | Failed`
//!   state machine with its capture retry budget
//! - [`Scheduler`]: three periodic loops driving the above until cancelled
//!
//! ```rust,no_run
//! use pmoprogramdb::ProgramDB;
//! use pmorecorder::{Recorder, Scheduler, SchedulerSettings};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let db = ProgramDB::init(std::path::Path::new("programs.sqlite3"))?;
//! let recorder = Arc::new(Recorder::builder(Arc::new(db)).build());
//! let scheduler = Scheduler::start(recorder, SchedulerSettings::default(), CancellationToken::new());
//! scheduler.stop();
//! scheduler.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod executor;
pub mod inflight;
pub mod recorder;
pub mod refresher;
pub mod scheduler;

pub use executor::{Executor, MAX_CAPTURE_ATTEMPTS};
pub use inflight::{Claim, InFlight};
pub use recorder::{Recorder, RecorderBuilder, RecordingTask};
pub use refresher::{RefreshReport, Refresher};
pub use scheduler::{Scheduler, SchedulerSettings};
