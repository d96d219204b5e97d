//! ffmpeg capture runner shared by the sources
//!
//! Streams are copied as-is (`-vcodec copy -acodec copy`) into a `.ts`
//! container. ffmpeg's stderr is forwarded line by line to `tracing`.

use crate::archive::ensure_parent_dir;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Default ffmpeg executable, resolved through `PATH`
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// One capture job
#[derive(Debug, Clone)]
pub struct CaptureJob {
    input: String,
    output: PathBuf,
    headers: Option<String>,
    duration: Option<Duration>,
}

impl CaptureJob {
    pub fn new(input: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            headers: None,
            duration: None,
        }
    }

    /// Extra HTTP headers sent with the input request
    pub fn headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    /// Stop after `duration` (live streams have no natural end)
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-loglevel".to_string(), "warning".to_string()];
        if let Some(headers) = &self.headers {
            args.push("-headers".to_string());
            args.push(headers.clone());
        }
        args.push("-i".to_string());
        args.push(self.input.clone());
        if let Some(duration) = self.duration {
            args.push("-t".to_string());
            args.push(duration.as_secs().to_string());
        }
        args.extend(
            ["-vcodec", "copy", "-acodec", "copy"]
                .into_iter()
                .map(String::from),
        );
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Runs ffmpeg as a child process
#[derive(Debug, Clone)]
pub struct FfmpegCapture {
    binary: PathBuf,
}

impl Default for FfmpegCapture {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG)
    }
}

impl FfmpegCapture {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run `job` to completion
    ///
    /// Any failure (archive directory, spawn, non-zero exit) collapses to
    /// `CaptureProcess`.
    pub async fn run(&self, job: &CaptureJob) -> Result<()> {
        ensure_parent_dir(job.output())
            .map_err(|e| Error::capture(format!("cannot prepare {}: {e}", job.output().display())))?;

        let args = job.args();
        debug!(binary = %self.binary.display(), ?args, "ffmpeg start");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::capture(format!("cannot spawn {}: {e}", self.binary.display())))?;

        let forwarder = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "ffmpeg", "{line}");
                }
            })
        });

        let status = child
            .wait()
            .await
            .map_err(|e| Error::capture(format!("ffmpeg wait failed: {e}")))?;

        if let Some(forwarder) = forwarder {
            let _ = forwarder.await;
        }

        if !status.success() {
            return Err(Error::capture(format!("ffmpeg exited with {status}")));
        }

        debug!(output = %job.output().display(), "ffmpeg finished");
        Ok(())
    }
}
