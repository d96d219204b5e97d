//! Error types shared by the recorder crates

use crate::model::Status;

/// Result type alias for recorder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause attached to an error
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while discovering, storing or capturing programs
///
/// `NotFound` is the only benign kind: it means "no eligible work" and the
/// preparation paths turn it into a no-op.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced a response (DNS, connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// The provider answered with a non-2xx status
    #[error("Unexpected HTTP status {status} from {url}")]
    NonSuccessStatus { status: u16, url: String },

    /// The provider payload could not be decoded into drafts
    #[error("Decode error: {0}")]
    Decode(#[source] BoxError),

    /// A civil timestamp could not be built from broadcast-day fields
    #[error("Time resolution failed: {0}")]
    TimeResolution(String),

    /// The external capture process failed to start or exited unsuccessfully
    #[error("Capture process failed: {0}")]
    CaptureProcess(String),

    /// The persistence store rejected or could not serve the call
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(#[source] BoxError),

    /// No row matched the query
    #[error("Not found: {0}")]
    NotFound(String),

    /// A status change that would break the Scheduled→Recording→terminal order
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    /// Filesystem error while preparing the archive
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a transport error from any cause
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }

    /// Create a decode error from any cause
    pub fn decode(err: impl Into<BoxError>) -> Self {
        Self::Decode(err.into())
    }

    /// Create a persistence error from any cause
    pub fn persistence(err: impl Into<BoxError>) -> Self {
        Self::PersistenceUnavailable(err.into())
    }

    /// Create a capture error
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::CaptureProcess(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// True when the error only signals that nothing matched
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_a_tag_check() {
        assert!(Error::not_found("no scheduled ondemand program").is_not_found());
        assert!(!Error::capture("ffmpeg exited with status 1").is_not_found());
        assert!(!Error::decode("bad json").is_not_found());
    }

    #[test]
    fn test_source_is_preserved() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::transport(io);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("refused"));
    }
}
