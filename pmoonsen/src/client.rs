//! HTTP client for the Onsen catalog
//!
//! The catalog is not date-scoped: every fetch returns the full current
//! listing, and each listed episode becomes one on-demand draft.

use crate::models::{Content, OnsenProgram};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use pmoprogram::archive::sanitize_name;
use pmoprogram::jst::{self, CalendarDate};
use pmoprogram::{
    CaptureJob, Clock, Error, FfmpegCapture, Program, ProgramDraft, ProgramSource,
    RecorderConfig, Result, Station, SystemClock,
};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default Onsen base URL
pub const DEFAULT_BASE_URL: &str = "https://www.onsen.ag";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "PMORecorder/0.1.0 (pmoonsen)";

/// Playlists answer 403 without this referer
pub const REFERER_HEADER: &str = "Referer: https://www.onsen.ag/\r\n";

/// Onsen catalog client
#[derive(Clone)]
pub struct OnsenClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    ffmpeg: FfmpegCapture,
}

impl std::fmt::Debug for OnsenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnsenClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("ffmpeg", &self.ffmpeg)
            .finish()
    }
}

impl OnsenClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and decode the raw catalog
    pub async fn fetch_catalog(&self) -> Result<Vec<OnsenProgram>> {
        let url = format!("{}/web_api/programs", self.base_url);
        debug!(%url, "fetching onsen catalog");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Error::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::NonSuccessStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await.map_err(Error::transport)?;
        serde_json::from_slice(&body).map_err(Error::decode)
    }
}

#[async_trait]
impl ProgramSource for OnsenClient {
    fn station(&self) -> Station {
        Station::Onsen
    }

    async fn fetch_schedule(&self, _date: CalendarDate) -> Result<Vec<ProgramDraft>> {
        let catalog = self.fetch_catalog().await?;
        let now = self.clock.now();

        let mut drafts = Vec::new();
        for program in &catalog {
            drafts.extend(program_to_drafts(now, program)?);
        }

        info!(programs = catalog.len(), drafts = drafts.len(), "fetched onsen catalog");
        Ok(drafts)
    }

    async fn capture(&self, config: &RecorderConfig, program: &Program) -> Result<()> {
        let Some(playlist_url) = program.playlist_url.as_deref() else {
            return Err(Error::capture(format!(
                "no playlist URL for onsen content {}",
                program.source_id
            )));
        };

        let file = archive_file_path(&config.archive_dir, program);
        let job = CaptureJob::new(playlist_url, file).headers(REFERER_HEADER);
        self.ffmpeg.run(&job).await
    }
}

/// One draft per listed episode of `program`
pub fn program_to_drafts(
    now: DateTime<FixedOffset>,
    program: &OnsenProgram,
) -> Result<Vec<ProgramDraft>> {
    program
        .contents
        .iter()
        .map(|content| content_to_draft(now, program, content))
        .collect()
}

fn content_to_draft(
    now: DateTime<FixedOffset>,
    program: &OnsenProgram,
    content: &Content,
) -> Result<ProgramDraft> {
    // Featured entries carry no date: file them under the fetch day
    let date = match content.delivery_date.as_deref().map(str::trim) {
        None | Some("") => CalendarDate::today(now),
        Some(mmdd) => date_from_mmdd(now, mmdd)?,
    };

    Ok(ProgramDraft::ondemand(
        Station::Onsen,
        content.id,
        program.title.clone(),
        content.title.clone(),
        date.start_of_day()?,
        content.streaming_url.clone(),
    ))
}

/// Parse "M/D" and infer its year relative to `now`
pub fn date_from_mmdd(now: DateTime<FixedOffset>, mmdd: &str) -> Result<CalendarDate> {
    let (month, day) = mmdd
        .split_once('/')
        .ok_or_else(|| Error::decode(format!("invalid delivery date {mmdd:?}")))?;
    let month: u32 = month
        .trim()
        .parse()
        .map_err(|_| Error::decode(format!("invalid month in {mmdd:?}")))?;
    let day: u32 = day
        .trim()
        .parse()
        .map_err(|_| Error::decode(format!("invalid day in {mmdd:?}")))?;

    jst::infer_year(now, month, day)
}

/// `<root>/onsen/<title>/<YYYY-MM-DD>_<title>_<episode>.ts`
pub fn archive_file_path(root: &Path, program: &Program) -> PathBuf {
    let title = sanitize_name(&program.title);
    let episode = sanitize_name(program.episode.as_deref().unwrap_or_default());
    let date = program.start.format("%Y-%m-%d");

    root.join(Station::Onsen.as_str())
        .join(&title)
        .join(format!("{date}_{title}_{episode}.ts"))
}

/// Builder for [`OnsenClient`]
pub struct ClientBuilder {
    client: Option<Client>,
    base_url: String,
    timeout: Duration,
    user_agent: String,
    clock: Arc<dyn Clock>,
    ffmpeg: FfmpegCapture,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            clock: Arc::new(SystemClock),
            ffmpeg: FfmpegCapture::default(),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the base URL (without trailing slash)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Clock used to infer the year of listing dates
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// ffmpeg runner used for captures
    pub fn ffmpeg(mut self, ffmpeg: FfmpegCapture) -> Self {
        self.ffmpeg = ffmpeg;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<OnsenClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .build()
                .map_err(Error::transport)?,
        };

        Ok(OnsenClient {
            client,
            base_url: self.base_url,
            timeout: self.timeout,
            clock: self.clock,
            ffmpeg: self.ffmpeg,
        })
    }
}
