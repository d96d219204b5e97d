use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pmoagqr::AgqrClient;
use pmoconfig::Config;
use pmoonsen::OnsenClient;
use pmoprogram::{FfmpegCapture, ProgramSource, SystemClock};
use pmoprogramdb::ProgramDB;
use pmorecorder::{Recorder, Scheduler};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod log;

#[derive(Parser)]
#[command(name = "pmorecorder", version, about = "Records Onsen and AGQR radio programs")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the recorder until interrupted
    Run {
        /// Configuration directory (defaults to $PMORECORDER_CONFIG, ./.pmorecorder, ~/.pmorecorder)
        #[arg(short, long)]
        config_dir: Option<String>,
    },
    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Version) => {
            println!("pmorecorder {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Run { config_dir }) => run(config_dir.unwrap_or_default()).await,
        None => run(String::new()).await,
    }
}

async fn run(config_dir: String) -> Result<()> {
    // ========== PHASE 1 : Configuration ==========
    let config = Config::load_config(&config_dir).context("cannot load configuration")?;
    log::set(log::filter_for(&config.get_log_min_level()?));
    info!(config_dir = %config.dir().display(), "configuration loaded");

    let recorder_config = config.recorder_config()?;
    let settings = config.scheduler_settings()?;
    debug!(?recorder_config, ?settings, "settings");

    // ========== PHASE 2 : Persistence ==========
    // Seule erreur fatale : la base ne peut pas être ouverte
    let db_path = config.get_database_path()?;
    let db = ProgramDB::init(&db_path)
        .with_context(|| format!("cannot open program database {}", db_path.display()))?;
    info!(database = %db_path.display(), "program database ready");

    // ========== PHASE 3 : Sources ==========
    let ffmpeg = FfmpegCapture::new(config.get_ffmpeg_binary()?);
    let sources = build_sources(&config, &ffmpeg)?;
    if sources.is_empty() {
        warn!("no source enabled, nothing will be recorded");
    }
    for source in &sources {
        info!(station = %source.station(), "source registered");
    }

    let recorder = sources
        .into_iter()
        .fold(Recorder::builder(Arc::new(db)), |builder, source| {
            builder.source(source)
        })
        .config(recorder_config)
        .clock(Arc::new(SystemClock))
        .build();

    // ========== PHASE 4 : Scheduler ==========
    let recorder = Arc::new(recorder);
    let token = CancellationToken::new();
    let scheduler = Scheduler::start(Arc::clone(&recorder), settings, token);

    info!("pmorecorder is running, press Ctrl+C to stop...");
    tokio::signal::ctrl_c()
        .await
        .context("cannot listen for Ctrl+C")?;

    // ========== PHASE 5 : Shutdown ==========
    // Plus de nouveaux cycles, mais les enregistrements en cours vont au bout
    scheduler.stop();
    scheduler.wait().await;
    recorder.wait_recordings().await;
    info!("pmorecorder stopped");
    Ok(())
}

fn build_sources(config: &Config, ffmpeg: &FfmpegCapture) -> Result<Vec<Arc<dyn ProgramSource>>> {
    let mut sources: Vec<Arc<dyn ProgramSource>> = Vec::new();

    if config.get_agqr_enabled()? {
        let agqr = AgqrClient::builder()
            .program_url(config.get_agqr_program_url()?)
            .stream_url(config.get_agqr_stream_url()?)
            .ffmpeg(ffmpeg.clone())
            .build()
            .context("cannot build agqr client")?;
        sources.push(Arc::new(agqr));
    }

    if config.get_onsen_enabled()? {
        let onsen = OnsenClient::builder()
            .base_url(config.get_onsen_base_url()?)
            .ffmpeg(ffmpeg.clone())
            .build()
            .context("cannot build onsen client")?;
        sources.push(Arc::new(onsen));
    }

    Ok(sources)
}
