//! # PMOProgram
//!
//! Common model and capability traits for the PMO recorder.
//!
//! This crate holds what every other recorder crate agrees on:
//!
//! - **Model**: [`Program`], [`ProgramDraft`], [`Status`], [`StreamType`], [`Station`]
//! - **Time**: JST calendar and the two inference rules in [`jst`]
//! - **Capabilities**: [`ProgramSource`] (providers) and [`ProgramPersistence`] (store)
//! - **Errors**: one [`Error`] enum, where `NotFound` is a tag check
//! - **Capture**: the ffmpeg runner and archive naming helpers used by sources
//!
//! ## Usage
//!
//! ```rust
//! use pmoprogram::jst::{self, CalendarDate};
//!
//! let day = CalendarDate::new(2022, 4, 1).unwrap();
//! let start = jst::resolve_broadcast_time(day, 25, 30).unwrap();
//! assert_eq!(start.to_rfc3339(), "2022-04-02T01:30:00+09:00");
//! ```

pub mod archive;
pub mod capture;
pub mod clock;
pub mod config;
pub mod error;
pub mod jst;
pub mod model;
pub mod source;

pub use capture::{CaptureJob, FfmpegCapture};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RecorderConfig;
pub use error::{BoxError, Error, Result};
pub use jst::CalendarDate;
pub use model::{
    ParseEnumError, Program, ProgramDraft, ProgramId, SaveOutcome, Station, Status, StreamType,
};
pub use source::{ProgramPersistence, ProgramSource};
