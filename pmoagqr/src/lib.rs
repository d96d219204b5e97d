//! AGQR source for the PMO recorder
//!
//! This crate implements [`pmoprogram::ProgramSource`] for the 超A&G+
//! broadcast grid:
//!
//! - **Grid**: one request per day, `?date=YYYY-MM-DD` (zero padded)
//! - **Times**: slots use broadcast-day hours, `24:30` is 00:30 the next day
//! - **Capture**: the live stream is recorded for the slot length plus the
//!   configured margin before and after
//!
//! # Example
//!
//! ```no_run
//! use pmoagqr::AgqrClient;
//! use pmoprogram::{CalendarDate, ProgramSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AgqrClient::new()?;
//!     let day = CalendarDate::new(2022, 8, 3)?;
//!     for draft in client.fetch_schedule(day).await? {
//!         println!("{} {}", draft.start, draft.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod models;

pub use client::{AgqrClient, ClientBuilder};
pub use models::AgqrProgram;
