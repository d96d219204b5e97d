use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, TimeZone};
use pmoprogram::{
    jst, CalendarDate, Clock, Error, ManualClock, Program, ProgramDraft, ProgramId,
    ProgramPersistence, ProgramSource, RecorderConfig, Result, SaveOutcome, Station, Status,
    StreamType,
};
use pmoprogramdb::ProgramDB;
use pmorecorder::{Recorder, Scheduler, SchedulerSettings, MAX_CAPTURE_ATTEMPTS};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// In-memory store that keeps the status history of every program
#[derive(Default)]
struct MemoryPersistence {
    programs: Mutex<Vec<Program>>,
    history: Mutex<HashMap<ProgramId, Vec<Status>>>,
    fail_on: Mutex<Option<Status>>,
}

impl MemoryPersistence {
    fn fail_on(&self, status: Status) {
        *self.fail_on.lock().unwrap() = Some(status);
    }

    fn history(&self, id: ProgramId) -> Vec<Status> {
        self.history.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }

    fn status(&self, id: ProgramId) -> Option<Status> {
        self.programs
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.status)
    }

    fn all(&self) -> Vec<Program> {
        self.programs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgramPersistence for MemoryPersistence {
    async fn save(&self, program: &Program) -> Result<SaveOutcome> {
        let mut programs = self.programs.lock().unwrap();
        if programs.iter().any(|p| p.natural_key() == program.natural_key()) {
            return Ok(SaveOutcome::AlreadyPresent);
        }
        programs.push(program.clone());
        self.history
            .lock()
            .unwrap()
            .insert(program.id, vec![program.status]);
        Ok(SaveOutcome::Inserted)
    }

    async fn load_ondemand_scheduled(&self, limit: usize) -> Result<Vec<Program>> {
        let mut found: Vec<Program> = self
            .programs
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.stream_type == StreamType::Ondemand && p.status == Status::Scheduled)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.start);
        found.truncate(limit);
        if found.is_empty() {
            return Err(Error::not_found("no scheduled ondemand"));
        }
        Ok(found)
    }

    async fn load_broadcast_start_in(
        &self,
        now: DateTime<FixedOffset>,
        window: Duration,
    ) -> Result<Vec<Program>> {
        let until = now + ChronoDuration::from_std(window).unwrap();
        let found: Vec<Program> = self
            .programs
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.stream_type == StreamType::Broadcast && p.status == Status::Scheduled)
            .filter(|p| p.start > now && p.start <= until)
            .cloned()
            .collect();
        if found.is_empty() {
            return Err(Error::not_found("no broadcast in window"));
        }
        Ok(found)
    }

    async fn change_status(&self, program: &Program, new_status: Status) -> Result<()> {
        if *self.fail_on.lock().unwrap() == Some(new_status) {
            return Err(Error::persistence("store offline"));
        }
        let mut programs = self.programs.lock().unwrap();
        let stored = programs
            .iter_mut()
            .find(|p| p.id == program.id)
            .ok_or_else(|| Error::not_found("unknown program"))?;
        stored.status = new_status;
        self.history
            .lock()
            .unwrap()
            .entry(program.id)
            .or_default()
            .push(new_status);
        Ok(())
    }
}

/// Source returning fixed drafts and scripted capture outcomes
#[derive(Debug)]
struct ScriptedSource {
    station: Station,
    drafts: Vec<ProgramDraft>,
    fail_fetch: bool,
    /// `true` = success; once exhausted every capture succeeds
    outcomes: Mutex<VecDeque<bool>>,
    fetches: AtomicUsize,
    captures: Mutex<Vec<(ProgramId, Instant)>>,
    capture_time: Duration,
}

impl ScriptedSource {
    fn new(station: Station, drafts: Vec<ProgramDraft>) -> Self {
        Self {
            station,
            drafts,
            fail_fetch: false,
            outcomes: Mutex::new(VecDeque::new()),
            fetches: AtomicUsize::new(0),
            captures: Mutex::new(Vec::new()),
            capture_time: Duration::ZERO,
        }
    }

    fn failing(station: Station) -> Self {
        Self {
            fail_fetch: true,
            ..Self::new(station, Vec::new())
        }
    }

    fn with_outcomes(self, outcomes: &[bool]) -> Self {
        *self.outcomes.lock().unwrap() = outcomes.iter().copied().collect();
        self
    }

    fn with_capture_time(self, capture_time: Duration) -> Self {
        Self {
            capture_time,
            ..self
        }
    }

    fn capture_count(&self) -> usize {
        self.captures.lock().unwrap().len()
    }

    fn capture_times(&self) -> Vec<Instant> {
        self.captures.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl ProgramSource for ScriptedSource {
    fn station(&self) -> Station {
        self.station
    }

    async fn fetch_schedule(&self, _date: CalendarDate) -> Result<Vec<ProgramDraft>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(Error::NonSuccessStatus {
                status: 503,
                url: "http://source.test/".to_string(),
            });
        }
        Ok(self.drafts.clone())
    }

    async fn capture(&self, _config: &RecorderConfig, program: &Program) -> Result<()> {
        self.captures
            .lock()
            .unwrap()
            .push((program.id, Instant::now()));
        if !self.capture_time.is_zero() {
            tokio::time::sleep(self.capture_time).await;
        }
        let ok = self.outcomes.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            Ok(())
        } else {
            Err(Error::capture("ffmpeg exited with 1"))
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn jst_time(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
    jst::offset().with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn now() -> DateTime<FixedOffset> {
    jst_time(2022, 8, 3, 23, 58)
}

fn ondemand_draft(id: i64, day: u32) -> ProgramDraft {
    ProgramDraft::ondemand(
        Station::Onsen,
        id,
        "セブン-イレブン presents 佐倉としたい大西",
        format!("第{id}回"),
        jst_time(2022, 8, day, 0, 0),
        Some("https://onsen.test/playlist.m3u8".to_string()),
    )
}

fn broadcast_draft(id: i64, start: DateTime<FixedOffset>) -> ProgramDraft {
    ProgramDraft::broadcast(
        Station::Agqr,
        id,
        "鷲崎健のヨルナイト×ヨルナイト",
        start,
        start + ChronoDuration::minutes(30),
    )
}

fn config() -> RecorderConfig {
    RecorderConfig::new("/tmp/archive", Duration::from_secs(120), Duration::from_secs(60))
}

fn recorder(
    store: &Arc<MemoryPersistence>,
    sources: &[Arc<ScriptedSource>],
    clock: Arc<dyn Clock>,
) -> Recorder {
    sources
        .iter()
        .fold(Recorder::builder(store.clone()), |builder, source| {
            builder.source(source.clone())
        })
        .config(config())
        .clock(clock)
        .build()
}

/// Paused timers resolve on millisecond ticks
fn assert_about(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(5),
        "expected about {expected:?}, got {actual:?}"
    );
}

async fn stored(store: &MemoryPersistence, draft: ProgramDraft) -> Program {
    let program = Program::ingest(draft);
    store.save(&program).await.unwrap();
    program
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_three_failures_then_success_is_done() {
    let store = Arc::new(MemoryPersistence::default());
    let onsen = Arc::new(
        ScriptedSource::new(Station::Onsen, Vec::new()).with_outcomes(&[false, false, false, true]),
    );
    let recorder = recorder(&store, &[onsen.clone()], Arc::new(ManualClock::new(now())));
    let program = stored(&store, ondemand_draft(1, 23)).await;

    let tasks = recorder
        .prepare_ondemand(2, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    let status = tasks.into_iter().next().unwrap().wait().await.unwrap();

    assert_eq!(status, Status::Done);
    assert_eq!(onsen.capture_count(), 4);
    assert_eq!(
        store.history(program.id),
        vec![Status::Scheduled, Status::Recording, Status::Done]
    );
}

#[tokio::test]
async fn test_four_failures_is_failed() {
    let store = Arc::new(MemoryPersistence::default());
    let onsen = Arc::new(
        ScriptedSource::new(Station::Onsen, Vec::new())
            .with_outcomes(&[false, false, false, false, true]),
    );
    let recorder = recorder(&store, &[onsen.clone()], Arc::new(ManualClock::new(now())));
    let program = stored(&store, ondemand_draft(1, 23)).await;

    let tasks = recorder
        .prepare_ondemand(2, Duration::from_secs(30))
        .await
        .unwrap();
    let status = tasks.into_iter().next().unwrap().wait().await.unwrap();

    assert_eq!(status, Status::Failed);
    assert_eq!(onsen.capture_count(), MAX_CAPTURE_ATTEMPTS);
    assert_eq!(
        store.history(program.id),
        vec![Status::Scheduled, Status::Recording, Status::Failed]
    );
}

#[tokio::test]
async fn test_recording_transition_failure_aborts_silently() {
    let store = Arc::new(MemoryPersistence::default());
    store.fail_on(Status::Recording);
    let onsen = Arc::new(ScriptedSource::new(Station::Onsen, Vec::new()));
    let recorder = recorder(&store, &[onsen.clone()], Arc::new(ManualClock::new(now())));
    let program = stored(&store, ondemand_draft(1, 23)).await;

    let tasks = recorder
        .prepare_ondemand(2, Duration::from_secs(30))
        .await
        .unwrap();
    let status = tasks.into_iter().next().unwrap().wait().await.unwrap();

    assert_eq!(status, Status::Scheduled);
    assert_eq!(onsen.capture_count(), 0);
    assert_eq!(store.status(program.id), Some(Status::Scheduled));
}

#[tokio::test]
async fn test_terminal_write_failure_keeps_recording() {
    let store = Arc::new(MemoryPersistence::default());
    store.fail_on(Status::Done);
    let onsen = Arc::new(ScriptedSource::new(Station::Onsen, Vec::new()));
    let recorder = recorder(&store, &[onsen.clone()], Arc::new(ManualClock::new(now())));
    let program = stored(&store, ondemand_draft(1, 23)).await;

    let tasks = recorder
        .prepare_ondemand(2, Duration::from_secs(30))
        .await
        .unwrap();
    let status = tasks.into_iter().next().unwrap().wait().await.unwrap();

    assert_eq!(status, Status::Recording);
    assert_eq!(onsen.capture_count(), 1);
    assert_eq!(store.status(program.id), Some(Status::Recording));
}

#[tokio::test]
async fn test_missing_source_marks_failed_without_capture() {
    let store = Arc::new(MemoryPersistence::default());
    let onsen = Arc::new(ScriptedSource::new(Station::Onsen, Vec::new()));
    let clock = Arc::new(ManualClock::new(now()));
    let recorder = recorder(&store, &[onsen.clone()], clock);
    let program = stored(&store, broadcast_draft(514569, jst_time(2022, 8, 4, 0, 0))).await;

    let tasks = recorder.prepare_broadcast().await.unwrap();
    let status = tasks.into_iter().next().unwrap().wait().await.unwrap();

    assert_eq!(status, Status::Failed);
    assert_eq!(onsen.capture_count(), 0);
    assert_eq!(
        store.history(program.id),
        vec![Status::Scheduled, Status::Recording, Status::Failed]
    );
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_waits_until_start_minus_margin() {
    let store = Arc::new(MemoryPersistence::default());
    let agqr = Arc::new(ScriptedSource::new(Station::Agqr, Vec::new()));
    // 23:58, start 00:00, margin 60s: capture expected at 23:59
    let recorder = recorder(&store, &[agqr.clone()], Arc::new(ManualClock::new(now())));
    stored(&store, broadcast_draft(514569, jst_time(2022, 8, 4, 0, 0))).await;

    let launched_at = Instant::now();
    let tasks = recorder.prepare_broadcast().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks.into_iter().next().unwrap().wait().await.unwrap(), Status::Done);

    let waited = agqr.capture_times()[0] - launched_at;
    assert_about(waited, Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_ondemand_has_no_pre_start_wait() {
    let store = Arc::new(MemoryPersistence::default());
    let onsen = Arc::new(ScriptedSource::new(Station::Onsen, Vec::new()));
    let recorder = recorder(&store, &[onsen.clone()], Arc::new(ManualClock::new(now())));
    // Published in the future relative to the clock: still captured at once
    stored(&store, ondemand_draft(1, 30)).await;

    let launched_at = Instant::now();
    let tasks = recorder
        .prepare_ondemand(2, Duration::from_secs(30))
        .await
        .unwrap();
    tasks.into_iter().next().unwrap().wait().await.unwrap();

    assert_about(onsen.capture_times()[0] - launched_at, Duration::ZERO);
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_ondemand_launches_are_staggered() {
    let store = Arc::new(MemoryPersistence::default());
    let onsen = Arc::new(ScriptedSource::new(Station::Onsen, Vec::new()));
    let recorder = recorder(&store, &[onsen.clone()], Arc::new(ManualClock::new(now())));
    for id in 1..=3 {
        stored(&store, ondemand_draft(id, 20 + id as u32)).await;
    }

    let started = Instant::now();
    let tasks = recorder
        .prepare_ondemand(2, Duration::from_secs(30))
        .await
        .unwrap();
    // Batch of two: one stagger between them, none after the last
    assert_eq!(tasks.len(), 2);
    assert_about(started.elapsed(), Duration::from_secs(30));

    for task in tasks {
        assert_eq!(task.wait().await.unwrap(), Status::Done);
    }
    let times = onsen.capture_times();
    assert_about(times[1] - times[0], Duration::from_secs(30));
    assert_eq!(onsen.capture_count(), 2);
}

#[tokio::test]
async fn test_nothing_to_prepare_is_not_an_error() {
    let store = Arc::new(MemoryPersistence::default());
    let recorder = recorder(&store, &[], Arc::new(ManualClock::new(now())));

    assert!(recorder
        .prepare_ondemand(2, Duration::from_secs(30))
        .await
        .unwrap()
        .is_empty());
    assert!(recorder.prepare_broadcast().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_broadcast_outside_window_is_not_prepared() {
    let store = Arc::new(MemoryPersistence::default());
    let agqr = Arc::new(ScriptedSource::new(Station::Agqr, Vec::new()));
    let recorder = recorder(&store, &[agqr.clone()], Arc::new(ManualClock::new(now())));
    stored(&store, broadcast_draft(1, jst_time(2022, 8, 4, 0, 1))).await;

    assert!(recorder.prepare_broadcast().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_prepare_skips_owned_program() {
    let store = Arc::new(MemoryPersistence::default());
    let agqr = Arc::new(ScriptedSource::new(Station::Agqr, Vec::new()));
    let recorder = recorder(&store, &[agqr.clone()], Arc::new(ManualClock::new(now())));
    let program = stored(&store, broadcast_draft(1, jst_time(2022, 8, 4, 0, 0))).await;

    // The first task has not run yet, the row is still Scheduled
    let first = recorder.prepare_broadcast().await.unwrap();
    let second = recorder.prepare_broadcast().await.unwrap();
    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert!(recorder.in_flight().contains(&program.id));

    for task in first {
        task.wait().await.unwrap();
    }
    assert_eq!(agqr.capture_count(), 1);
    assert!(recorder.in_flight().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_broadcasts_in_window_launch_together() {
    let store = Arc::new(MemoryPersistence::default());
    let agqr = Arc::new(ScriptedSource::new(Station::Agqr, Vec::new()));
    let recorder = recorder(&store, &[agqr.clone()], Arc::new(ManualClock::new(now())));
    for id in 1..=3 {
        stored(&store, broadcast_draft(id, jst_time(2022, 8, 4, 0, 0))).await;
    }

    let started = Instant::now();
    let tasks = recorder.prepare_broadcast().await.unwrap();
    assert_eq!(tasks.len(), 3);
    assert_about(started.elapsed(), Duration::ZERO);

    for task in tasks {
        assert_eq!(task.wait().await.unwrap(), Status::Done);
    }
}

// ---------------------------------------------------------------------------
// Refresher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_repeated_refresh_never_duplicates() {
    let store = Arc::new(MemoryPersistence::default());
    let onsen = Arc::new(ScriptedSource::new(
        Station::Onsen,
        vec![ondemand_draft(1, 23), ondemand_draft(2, 16)],
    ));
    let agqr = Arc::new(ScriptedSource::new(
        Station::Agqr,
        vec![broadcast_draft(1, jst_time(2022, 8, 4, 0, 0))],
    ));
    let recorder = recorder(
        &store,
        &[onsen.clone(), agqr.clone()],
        Arc::new(ManualClock::new(now())),
    );

    let first = recorder.refresh().await.unwrap();
    assert_eq!(first.inserted, 3);
    for _ in 0..3 {
        let again = recorder.refresh().await.unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.already_present, 3);
    }

    let mut keys: Vec<_> = store.all().iter().map(Program::natural_key).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 3);
    assert_eq!(store.all().len(), 3);
}

#[tokio::test]
async fn test_failing_source_aborts_remaining_sources() {
    let store = Arc::new(MemoryPersistence::default());
    let onsen = Arc::new(ScriptedSource::new(Station::Onsen, vec![ondemand_draft(1, 23)]));
    let broken = Arc::new(ScriptedSource::failing(Station::Agqr));
    let never = Arc::new(ScriptedSource::new(Station::Onsen, vec![ondemand_draft(2, 23)]));
    let recorder = recorder(
        &store,
        &[onsen.clone(), broken.clone(), never.clone()],
        Arc::new(ManualClock::new(now())),
    );

    let err = recorder.refresh().await.unwrap_err();
    assert!(matches!(err, Error::NonSuccessStatus { status: 503, .. }));
    // Saved before the failure, kept
    assert_eq!(store.all().len(), 1);
    assert_eq!(never.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refresh_against_sqlite_is_idempotent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = Arc::new(ProgramDB::init(&temp_dir.path().join("programs.sqlite3")).unwrap());
    let onsen = Arc::new(ScriptedSource::new(
        Station::Onsen,
        vec![ondemand_draft(1, 23), ondemand_draft(2, 16)],
    ));
    let recorder = Recorder::builder(db.clone())
        .source(onsen)
        .clock(Arc::new(ManualClock::new(now())))
        .build();

    recorder.refresh().await.unwrap();
    recorder.refresh().await.unwrap();
    assert_eq!(db.count().unwrap(), 2);

    let tasks = recorder
        .prepare_ondemand(1, Duration::from_secs(0))
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    for task in tasks {
        assert_eq!(task.wait().await.unwrap(), Status::Done);
    }
    let statuses: Vec<Status> = db.get_all().unwrap().iter().map(|p| p.status).collect();
    assert!(statuses.contains(&Status::Done));
    assert!(statuses.contains(&Status::Scheduled));
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_scheduler_runs_cycles_until_stopped() {
    let store = Arc::new(MemoryPersistence::default());
    let onsen = Arc::new(ScriptedSource::new(Station::Onsen, vec![ondemand_draft(1, 23)]));
    let recorder = Arc::new(recorder(
        &store,
        &[onsen.clone()],
        Arc::new(ManualClock::new(now())),
    ));

    let settings = SchedulerSettings {
        refresh_interval: Duration::from_secs(60),
        ondemand_interval: Duration::from_secs(60),
        broadcast_interval: Duration::from_secs(60),
        ondemand_batch_size: 2,
        ondemand_stagger: Duration::from_secs(30),
    };
    let token = CancellationToken::new();
    let scheduler = Scheduler::start(recorder.clone(), settings, token.clone());

    // Two full periods
    tokio::time::sleep(Duration::from_secs(150)).await;
    scheduler.stop();
    assert!(token.is_cancelled());
    scheduler.wait().await;

    let fetches = onsen.fetches.load(Ordering::SeqCst);
    assert_eq!(fetches, 3);

    // Stopped: no more cycles
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(onsen.fetches.load(Ordering::SeqCst), fetches);

    let program = &store.all()[0];
    assert_eq!(store.status(program.id), Some(Status::Done));
    assert_eq!(onsen.capture_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_survives_failing_cycle() {
    let store = Arc::new(MemoryPersistence::default());
    let broken = Arc::new(ScriptedSource::failing(Station::Agqr));
    let recorder = Arc::new(recorder(
        &store,
        &[broken.clone()],
        Arc::new(ManualClock::new(now())),
    ));

    let settings = SchedulerSettings {
        refresh_interval: Duration::from_secs(10),
        ..SchedulerSettings::default()
    };
    let scheduler = Scheduler::start(recorder, settings, CancellationToken::new());

    tokio::time::sleep(Duration::from_secs(35)).await;
    scheduler.stop();
    scheduler.wait().await;

    assert_eq!(broken.fetches.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_lets_running_capture_finish() {
    let store = Arc::new(MemoryPersistence::default());
    let onsen = Arc::new(
        ScriptedSource::new(Station::Onsen, Vec::new())
            .with_capture_time(Duration::from_secs(5)),
    );
    let recorder = Arc::new(recorder(
        &store,
        &[onsen.clone()],
        Arc::new(ManualClock::new(now())),
    ));
    let program = stored(&store, ondemand_draft(1, 23)).await;

    let scheduler = Scheduler::start(
        recorder.clone(),
        SchedulerSettings::default(),
        CancellationToken::new(),
    );

    // First cycles ran, capture still in progress
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(onsen.capture_count(), 1);
    assert_eq!(recorder.recordings_in_progress(), 1);
    assert_eq!(store.status(program.id), Some(Status::Recording));

    scheduler.stop();
    scheduler.wait().await;
    recorder.wait_recordings().await;

    assert_eq!(recorder.recordings_in_progress(), 0);
    assert_eq!(store.status(program.id), Some(Status::Done));
    assert_eq!(
        store.history(program.id),
        vec![Status::Scheduled, Status::Recording, Status::Done]
    );
}

#[tokio::test]
async fn test_wait_recordings_without_launch_returns() {
    let store = Arc::new(MemoryPersistence::default());
    let recorder = recorder(&store, &[], Arc::new(ManualClock::new(now())));

    recorder.wait_recordings().await;
    assert_eq!(recorder.recordings_in_progress(), 0);
}
