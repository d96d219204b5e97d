//! Program entity and its closed enumerations

use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Content provider a program comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Station {
    /// 音泉 on-demand catalog
    Onsen,
    /// 超A&G+ broadcast grid
    Agqr,
}

impl Station {
    pub fn as_str(&self) -> &'static str {
        match self {
            Station::Onsen => "onsen",
            Station::Agqr => "agqr",
        }
    }
}

/// Lifecycle status of a program
///
/// Transitions only move forward: `Scheduled → Recording → {Done | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Scheduled,
    Recording,
    Done,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Scheduled => "scheduled",
            Status::Recording => "recording",
            Status::Done => "done",
            Status::Failed => "failed",
        }
    }

    /// Done and Failed programs are never revisited
    pub fn is_terminal(&self) -> bool {
        match self {
            Status::Done | Status::Failed => true,
            Status::Scheduled | Status::Recording => false,
        }
    }

    /// Whether `self → next` follows the lifecycle order
    pub fn can_transition_to(&self, next: Status) -> bool {
        match (self, next) {
            (Status::Scheduled, Status::Recording) => true,
            (Status::Recording, Status::Done | Status::Failed) => true,
            _ => false,
        }
    }
}

/// How a program is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Live content with a fixed start and end, captured in real time
    Broadcast,
    /// Pre-recorded content available at any time once published
    Ondemand,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Broadcast => "broadcast",
            StreamType::Ondemand => "ondemand",
        }
    }
}

/// Error returned when a stored enum value is unknown
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

macro_rules! impl_str_enum {
    ($ty:ident, $kind:expr, [$($variant:ident),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == $ty::$variant.as_str() {
                        return Ok($ty::$variant);
                    }
                )+
                Err(ParseEnumError {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

impl_str_enum!(Station, "station", [Onsen, Agqr]);
impl_str_enum!(Status, "status", [Scheduled, Recording, Done, Failed]);
impl_str_enum!(StreamType, "stream type", [Broadcast, Ondemand]);

/// Process-generated identity of a stored program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(Uuid);

impl ProgramId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProgramId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ProgramId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A program as discovered by a source, before ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDraft {
    pub station: Station,
    /// Identifier native to the provider; unique per station
    pub source_id: i64,
    pub title: String,
    /// Episode label, only for on-demand content
    pub episode: Option<String>,
    pub start: DateTime<FixedOffset>,
    /// Only meaningful for broadcast content
    pub end: Option<DateTime<FixedOffset>>,
    pub stream_type: StreamType,
    /// Direct media address, only for on-demand content that exposes one
    pub playlist_url: Option<String>,
}

impl ProgramDraft {
    /// Draft for live content with a fixed time window
    pub fn broadcast(
        station: Station,
        source_id: i64,
        title: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            station,
            source_id,
            title: title.into(),
            episode: None,
            start,
            end: Some(end),
            stream_type: StreamType::Broadcast,
            playlist_url: None,
        }
    }

    /// Draft for on-demand content
    pub fn ondemand(
        station: Station,
        source_id: i64,
        title: impl Into<String>,
        episode: impl Into<String>,
        start: DateTime<FixedOffset>,
        playlist_url: Option<String>,
    ) -> Self {
        let episode = episode.into();
        Self {
            station,
            source_id,
            title: title.into(),
            episode: (!episode.is_empty()).then_some(episode),
            start,
            end: None,
            stream_type: StreamType::Ondemand,
            playlist_url: playlist_url.filter(|url| !url.is_empty()),
        }
    }
}

/// Unit of work: one schedulable, recordable program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub id: ProgramId,
    pub station: Station,
    pub source_id: i64,
    pub title: String,
    pub episode: Option<String>,
    pub start: DateTime<FixedOffset>,
    pub end: Option<DateTime<FixedOffset>>,
    pub status: Status,
    pub stream_type: StreamType,
    pub playlist_url: Option<String>,
}

impl Program {
    /// Turn a draft into a fresh `Scheduled` program with a new identity
    pub fn ingest(draft: ProgramDraft) -> Self {
        Self {
            id: ProgramId::new(),
            station: draft.station,
            source_id: draft.source_id,
            title: draft.title,
            episode: draft.episode,
            start: draft.start,
            end: draft.end,
            status: Status::Scheduled,
            stream_type: draft.stream_type,
            playlist_url: draft.playlist_url,
        }
    }

    /// Natural key `(station, source_id)`
    pub fn natural_key(&self) -> (Station, i64) {
        (self.station, self.source_id)
    }

    /// Real-time capture length for broadcast content, padded by `margin` on both sides
    ///
    /// `None` for on-demand content or when the window is inverted.
    pub fn capture_duration(&self, margin: Duration) -> Option<Duration> {
        if self.stream_type != StreamType::Broadcast {
            return None;
        }
        let window = self.end?.signed_duration_since(self.start).to_std().ok()?;
        Some(window + margin * 2)
    }
}

/// Result of an insert-if-absent save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    /// The natural key already existed; nothing was changed
    AlreadyPresent,
}
