use tracing_subscriber::EnvFilter;

/// Install the global subscriber; `RUST_LOG` wins over the configured level
pub fn set(env_filter: String) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(env_filter)))
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();
}

/// Default filter for a configured minimum level
pub fn filter_for(level: &str) -> String {
    let level = level.trim().to_lowercase();
    format!(
        "pmorecorder={level},PMORecorder={level},pmoprogram={level},pmoprogramdb={level},\
         pmoonsen={level},pmoagqr={level},ffmpeg=warn,reqwest=warn"
    )
}
