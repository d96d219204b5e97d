//! Recorder settings handed to captures

use std::path::PathBuf;
use std::time::Duration;

/// Settings consumed verbatim by sources and the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Root directory of the archive
    pub archive_dir: PathBuf,

    /// Broadcasts starting within this window are prepared
    pub prepare_after: Duration,

    /// Padding before and after a broadcast window;
    /// total capture time = margin + program length + margin
    pub margin: Duration,
}

impl RecorderConfig {
    pub fn new(archive_dir: impl Into<PathBuf>, prepare_after: Duration, margin: Duration) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            prepare_after,
            margin,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::new("./archive", Duration::from_secs(120), Duration::from_secs(60))
    }
}
