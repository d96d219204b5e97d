//! Data models for the Onsen catalog API
//!
//! `GET /web_api/programs` returns every program with its currently
//! listed episodes. Only the fields the recorder needs are modelled.

use serde::Deserialize;

/// One program of the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct OnsenProgram {
    /// Program id (e.g. 17)
    pub id: i64,

    /// Program title (e.g. "セブン-イレブン presents 佐倉としたい大西")
    pub title: String,

    /// Listed episodes, latest first
    #[serde(default)]
    pub contents: Vec<Content>,
}

/// One listed episode
#[derive(Debug, Clone, Deserialize)]
pub struct Content {
    /// Episode id, unique across the catalog (e.g. 11134)
    pub id: i64,

    /// Episode label (e.g. "第334回")
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub program_id: Option<i64>,

    /// Past episodes are premium-only
    #[serde(default)]
    pub premium: bool,

    #[serde(default)]
    pub free: bool,

    /// "M/D" without zero padding (e.g. "8/23").
    /// `null` marks a featured entry with no date.
    #[serde(default)]
    pub delivery_date: Option<String>,

    /// HLS playlist URL; `null` for premium episodes
    #[serde(default)]
    pub streaming_url: Option<String>,

    #[serde(default)]
    pub expiring: bool,
}
