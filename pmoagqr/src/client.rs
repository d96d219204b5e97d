//! HTTP client for the AGQR program grid
//!
//! The grid is date-scoped (`?date=YYYY-MM-DD`). Each slot becomes one
//! broadcast draft; captures record the single live stream for the slot's
//! length plus the configured margin on both sides.

use crate::models::AgqrProgram;
use async_trait::async_trait;
use chrono::NaiveDate;
use pmoprogram::archive::sanitize_name;
use pmoprogram::jst::{self, CalendarDate};
use pmoprogram::{
    CaptureJob, Error, FfmpegCapture, Program, ProgramDraft, ProgramSource, RecorderConfig,
    Result, Station,
};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default program grid endpoint
pub const DEFAULT_PROGRAM_URL: &str = "https://www.joqr.co.jp/rss/program/json.php?type=ag";

/// Default live stream (low quality HLS served to the web player)
pub const DEFAULT_STREAM_URL: &str = "https://hlsb2.cdnext.stream.ne.jp/agqr1next/aandg1next.m3u8";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "PMORecorder/0.1.0 (pmoagqr)";

/// AGQR grid client
#[derive(Debug, Clone)]
pub struct AgqrClient {
    client: Client,
    program_url: Url,
    stream_url: String,
    timeout: Duration,
    ffmpeg: FfmpegCapture,
}

impl AgqrClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn program_url(&self) -> &Url {
        &self.program_url
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Fetch and decode the raw grid for `date`
    pub async fn fetch_grid(&self, date: CalendarDate) -> Result<Vec<AgqrProgram>> {
        let url = build_url(&self.program_url, date);
        debug!(%url, %date, "fetching agqr grid");

        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Error::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::NonSuccessStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(Error::transport)?;
        // Days far in the future answer `null`
        let grid: Option<Vec<AgqrProgram>> =
            serde_json::from_slice(&body).map_err(Error::decode)?;
        Ok(grid.unwrap_or_default())
    }
}

#[async_trait]
impl ProgramSource for AgqrClient {
    fn station(&self) -> Station {
        Station::Agqr
    }

    async fn fetch_schedule(&self, date: CalendarDate) -> Result<Vec<ProgramDraft>> {
        let grid = self.fetch_grid(date).await?;
        let drafts = grid
            .iter()
            .map(program_to_draft)
            .collect::<Result<Vec<_>>>()?;

        info!(%date, drafts = drafts.len(), "fetched agqr grid");
        Ok(drafts)
    }

    async fn capture(&self, config: &RecorderConfig, program: &Program) -> Result<()> {
        let duration = program.capture_duration(config.margin).ok_or_else(|| {
            Error::capture(format!(
                "agqr slot {} has no valid time window",
                program.source_id
            ))
        })?;

        let file = archive_file_path(&config.archive_dir, program);
        let job = CaptureJob::new(self.stream_url.as_str(), file).duration(duration);
        self.ffmpeg.run(&job).await
    }
}

/// Set the `date` query parameter, keeping the others
pub fn build_url(base: &Url, date: CalendarDate) -> Url {
    let mut url = base.clone();
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != "date")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("date", &date.to_string());
    url
}

fn parse_field<T: std::str::FromStr>(value: &str, field: &str, slot: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::decode(format!("slot {slot}: invalid {field} {value:?}")))
}

/// Convert one grid slot into a broadcast draft
pub fn program_to_draft(slot: &AgqrProgram) -> Result<ProgramDraft> {
    let id = slot.schedule_program_id.as_str();
    let source_id: i64 = parse_field(id, "schedule_program_id", id)?;

    let date = NaiveDate::parse_from_str(slot.schedule_date.trim(), "%Y-%m-%d")
        .map(CalendarDate::from)
        .map_err(|e| Error::decode(format!("slot {id}: invalid schedule_date: {e}")))?;

    let start = jst::resolve_broadcast_time(
        date,
        parse_field(&slot.program_start_time_hour, "start hour", id)?,
        parse_field(&slot.program_start_time_minute, "start minute", id)?,
    )
    .map_err(Error::decode)?;
    let end = jst::resolve_broadcast_time(
        date,
        parse_field(&slot.program_end_time_hour, "end hour", id)?,
        parse_field(&slot.program_end_time_minute, "end minute", id)?,
    )
    .map_err(Error::decode)?;

    debug!(
        slot = id,
        title = %slot.program_title,
        personalities = ?slot.personalities(),
        "agqr slot"
    );

    Ok(ProgramDraft::broadcast(
        Station::Agqr,
        source_id,
        slot.program_title.clone(),
        start,
        end,
    ))
}

/// `<root>/agqr/<YYYY-MM-DD>/<YYYY-MM-DD_HHMM>_<title>.ts`
pub fn archive_file_path(root: &Path, program: &Program) -> PathBuf {
    let start = program.start.with_timezone(&jst::offset());
    root.join(Station::Agqr.as_str())
        .join(start.format("%Y-%m-%d").to_string())
        .join(format!(
            "{}_{}.ts",
            start.format("%Y-%m-%d_%H%M"),
            sanitize_name(&program.title)
        ))
}

/// Builder for [`AgqrClient`]
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    program_url: String,
    stream_url: String,
    timeout: Duration,
    user_agent: String,
    ffmpeg: FfmpegCapture,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            program_url: DEFAULT_PROGRAM_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
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

    /// Set the program grid endpoint
    pub fn program_url(mut self, url: impl Into<String>) -> Self {
        self.program_url = url.into();
        self
    }

    /// Set the live stream captured for every slot
    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = url.into();
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

    /// ffmpeg runner used for captures
    pub fn ffmpeg(mut self, ffmpeg: FfmpegCapture) -> Self {
        self.ffmpeg = ffmpeg;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AgqrClient> {
        let program_url = Url::parse(&self.program_url).map_err(Error::decode)?;
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .build()
                .map_err(Error::transport)?,
        };

        Ok(AgqrClient {
            client,
            program_url,
            stream_url: self.stream_url,
            timeout: self.timeout,
            ffmpeg: self.ffmpeg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn jst_time(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        jst::offset().with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn slot(id: &str, start: (&str, &str), end: (&str, &str), title: &str) -> AgqrProgram {
        AgqrProgram {
            schedule_program_id: id.to_string(),
            schedule_date: "2022-08-03".to_string(),
            program_id: "1791".to_string(),
            program_start_time: format!("{}:{}", start.0, start.1),
            program_start_time_hour: start.0.to_string(),
            program_start_time_minute: start.1.to_string(),
            program_end_time: format!("{}:{}", end.0, end.1),
            program_end_time_hour: end.0.to_string(),
            program_end_time_minute: end.1.to_string(),
            program_information: String::new(),
            program_title: title.to_string(),
            program_personality: "鷲崎健, 青木佑磨".to_string(),
        }
    }

    #[test]
    fn test_build_url_zero_pads() {
        let base = Url::parse(DEFAULT_PROGRAM_URL).unwrap();
        let got = build_url(&base, CalendarDate::new(2022, 8, 1).unwrap());
        assert_eq!(
            got.as_str(),
            "https://www.joqr.co.jp/rss/program/json.php?type=ag&date=2022-08-01"
        );
    }

    #[test]
    fn test_build_url_replaces_previous_date() {
        let base = Url::parse("https://grid.test/json.php?type=ag&date=2020-01-01").unwrap();
        let got = build_url(&base, CalendarDate::new(2022, 12, 31).unwrap());
        assert_eq!(got.as_str(), "https://grid.test/json.php?type=ag&date=2022-12-31");
    }

    #[test]
    fn test_daytime_slot() {
        let draft = program_to_draft(&slot(
            "514579",
            ("11", "30"),
            ("12", "0"),
            "セブン-イレブンpresents 佐倉としたい大西",
        ))
        .unwrap();

        assert_eq!(
            draft,
            ProgramDraft::broadcast(
                Station::Agqr,
                514579,
                "セブン-イレブンpresents 佐倉としたい大西",
                jst_time(2022, 8, 3, 11, 30),
                jst_time(2022, 8, 3, 12, 0),
            )
        );
    }

    #[test]
    fn test_late_night_slot_rolls_to_next_day() {
        let draft = program_to_draft(&slot(
            "514569",
            ("24", "0"),
            ("24", "30"),
            "鷲崎健のヨルナイト×ヨルナイト",
        ))
        .unwrap();

        assert_eq!(draft.start, jst_time(2022, 8, 4, 0, 0));
        assert_eq!(draft.end, Some(jst_time(2022, 8, 4, 0, 30)));
    }

    #[test]
    fn test_invalid_fields_are_decode_errors() {
        let bad_id = slot("abc", ("1", "0"), ("2", "0"), "x");
        assert!(matches!(program_to_draft(&bad_id), Err(Error::Decode(_))));

        let bad_hour = slot("1", ("", "0"), ("2", "0"), "x");
        assert!(matches!(program_to_draft(&bad_hour), Err(Error::Decode(_))));

        let mut bad_date = slot("1", ("1", "0"), ("2", "0"), "x");
        bad_date.schedule_date = "2022/08/03".to_string();
        assert!(matches!(program_to_draft(&bad_date), Err(Error::Decode(_))));
    }

    #[test]
    fn test_personalities() {
        let s = slot("1", ("1", "0"), ("2", "0"), "x");
        assert_eq!(s.personalities(), vec!["鷲崎健", "青木佑磨"]);
    }

    #[test]
    fn test_archive_file_path() {
        let program = Program::ingest(ProgramDraft::broadcast(
            Station::Agqr,
            514569,
            "鷲崎健のヨルナイト×ヨルナイト",
            jst_time(2022, 8, 4, 0, 0),
            jst_time(2022, 8, 4, 0, 30),
        ));

        assert_eq!(
            archive_file_path(Path::new("/archive"), &program),
            PathBuf::from("/archive/agqr/2022-08-04/2022-08-04_0000_鷲崎健のヨルナイト×ヨルナイト.ts")
        );
    }

    #[tokio::test]
    async fn test_capture_requires_time_window() {
        let client = AgqrClient::builder()
            .ffmpeg(FfmpegCapture::new("/nonexistent/ffmpeg"))
            .build()
            .unwrap();
        let mut program = Program::ingest(ProgramDraft::broadcast(
            Station::Agqr,
            1,
            "x",
            jst_time(2022, 8, 4, 0, 0),
            jst_time(2022, 8, 4, 0, 30),
        ));
        program.end = None;

        let tmp = tempfile::tempdir().unwrap();
        let config = RecorderConfig::new(tmp.path(), Duration::from_secs(120), Duration::from_secs(60));
        let err = client.capture(&config, &program).await.unwrap_err();
        assert!(matches!(err, Error::CaptureProcess(_)));
    }
}
