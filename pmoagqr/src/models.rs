//! Data models for the AGQR program grid API
//!
//! Every field is sent as a string. Hours follow the broadcast-day
//! convention and may be 24 or more.

use serde::Deserialize;

/// One slot of the daily grid
#[derive(Debug, Clone, Deserialize)]
pub struct AgqrProgram {
    /// Slot id, unique per airing (e.g. "514530")
    pub schedule_program_id: String,

    /// Nominal broadcast day (e.g. "2022-08-02")
    pub schedule_date: String,

    /// Show id shared by every airing (e.g. "1791")
    #[serde(default)]
    pub program_id: String,

    /// "5:00", "24:00"
    #[serde(default)]
    pub program_start_time: String,
    pub program_start_time_hour: String,
    pub program_start_time_minute: String,

    /// "6:00", "24:30"
    #[serde(default)]
    pub program_end_time: String,
    pub program_end_time_hour: String,
    pub program_end_time_minute: String,

    #[serde(default)]
    pub program_information: String,

    pub program_title: String,

    /// Comma separated (e.g. "鷲崎健, 沢口けいこ")
    #[serde(default)]
    pub program_personality: String,
}

impl AgqrProgram {
    /// Personalities split on commas
    pub fn personalities(&self) -> Vec<&str> {
        self.program_personality
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }
}
