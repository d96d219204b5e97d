//! Onsen source for the PMO recorder
//!
//! This crate implements [`pmoprogram::ProgramSource`] for the Onsen
//! on-demand catalog:
//!
//! - **Catalog**: `GET /web_api/programs` returns the full listing; the date
//!   passed to `fetch_schedule` is ignored
//! - **Dates**: episodes carry "M/D" only, the year is inferred from the clock
//! - **Capture**: the episode's HLS playlist is copied by ffmpeg with the
//!   referer the CDN requires
//!
//! # Example
//!
//! ```no_run
//! use pmoonsen::OnsenClient;
//! use pmoprogram::{CalendarDate, ProgramSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OnsenClient::new()?;
//!     let today = CalendarDate::new(2022, 8, 25)?;
//!     let drafts = client.fetch_schedule(today).await?;
//!     println!("{} episodes listed", drafts.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod models;

pub use client::{ClientBuilder, OnsenClient};
pub use models::{Content, OnsenProgram};
