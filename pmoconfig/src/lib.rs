//! # PMORecorder Configuration Module
//!
//! This module provides configuration management for the recorder daemon:
//! - Loading configuration from YAML files
//! - Merging with the embedded default configuration
//! - Environment variable overrides (`PMORECORDER_CONFIG__RECORDER__MARGIN_SECS=30`)
//! - Typed getters and the assembled [`RecorderConfig`] / [`SchedulerSettings`]
//!
//! There is no global instance: the binary loads one [`Config`] and hands
//! the assembled settings to the components that need them.
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::Config;
//!
//! let config = Config::load_config("")?;
//! let recorder = config.recorder_config()?;
//! let scheduler = config.scheduler_settings()?;
//! println!("archive in {}", recorder.archive_dir.display());
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use pmoprogram::RecorderConfig;
use pmorecorder::SchedulerSettings;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tracing::{info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmorecorder.yaml");

const CONFIG_DIR_NAME: &str = ".pmorecorder";
const ENV_CONFIG_DIR: &str = "PMORECORDER_CONFIG";
const ENV_PREFIX: &str = "PMORECORDER_CONFIG__";

// Default values for configuration
const DEFAULT_LOG_MIN_LEVEL: &str = "info";
const DEFAULT_ARCHIVE_DIR: &str = "archive";
const DEFAULT_DATABASE_PATH: &str = "programs.sqlite3";
const DEFAULT_FFMPEG: &str = "ffmpeg";
const DEFAULT_ONSEN_BASE_URL: &str = "https://www.onsen.ag";
const DEFAULT_AGQR_PROGRAM_URL: &str = "https://www.joqr.co.jp/rss/program/json.php?type=ag";
const DEFAULT_AGQR_STREAM_URL: &str =
    "https://hlsb2.cdnext.stream.ne.jp/agqr1next/aandg1next.m3u8";
const DEFAULT_PREPARE_AFTER_SECS: u64 = 120;
const DEFAULT_MARGIN_SECS: u64 = 60;
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3600;
const DEFAULT_ONDEMAND_INTERVAL_SECS: u64 = 600;
const DEFAULT_BROADCAST_INTERVAL_SECS: u64 = 60;
const DEFAULT_ONDEMAND_BATCH_SIZE: usize = 2;
const DEFAULT_ONDEMAND_STAGGER_SECS: u64 = 30;

/// Macro to generate a getter for unsigned values with default
///
/// Durations are stored as whole seconds, so they are never negative.
macro_rules! impl_u64_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<u64> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => n.as_u64().ok_or_else(|| {
                    anyhow!("{} must be a non-negative integer, got {}", $path.join("."), n)
                }),
                Ok(Value::String(s)) => s
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a non-negative integer", $path.join("."))),
                _ => Ok($default),
            }
        }
    };
}

/// Macro to generate a getter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }
    };
}

/// Macro to generate a getter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.is_empty() => Ok(s),
                _ => Ok($default.to_string()),
            }
        }
    };
}

/// Configuration manager for the recorder
///
/// This structure manages the application configuration, including:
/// - Loading configuration from YAML files
/// - Merging with default configuration
/// - Handling environment variable overrides
/// - Providing typed getters for configuration values
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(self.data().clone()),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        // 1. Try provided directory
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        // 3. Try current directory
        if Path::new(CONFIG_DIR_NAME).exists() {
            return PathBuf::from(CONFIG_DIR_NAME);
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config;
            }
        }

        // Default fallback
        PathBuf::from(CONFIG_DIR_NAME)
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")
            .with_context(|| format!("{} is not writable", path.display()))?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path).with_context(|| format!("{} is not readable", path.display()))?;
        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PMORECORDER_CONFIG` environment variable
    /// 3. `.pmorecorder` in the current directory
    /// 4. `.pmorecorder` in the user's home directory
    ///
    /// The directory is created if it doesn't exist, and validated for
    /// read/write permissions.
    pub fn config_dir(directory: &str) -> Result<PathBuf> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(&dir_path)?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join("config.yaml");

        let mut default_value: Value =
            serde_yaml::from_str(DEFAULT_CONFIG).context("embedded configuration is invalid")?;

        let yaml_data = match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path.display(), "Loaded config file");
                data
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using default embedded config");
                DEFAULT_CONFIG.as_bytes().to_vec()
            }
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        // Un fichier vide se lit comme `null` : rien à fusionner
        if !external_value.is_null() {
            merge_yaml(&mut default_value, &lower_keys_value(external_value));
        }
        let mut config_value = lower_keys_value(default_value);

        apply_env_overrides(&mut config_value, env::vars());

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Directory holding `config.yaml`; relative paths are resolved against it
    pub fn dir(&self) -> &Path {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data())?;
        fs::write(&self.path, yaml)
            .with_context(|| format!("cannot write {}", self.path.display()))?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["recorder", "margin_secs"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        set_value_internal(&mut self.data(), path, value)?;
        self.save()
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        get_value_internal(&self.data(), path)
    }

    /// Résout un chemin relatif par rapport au répertoire de configuration
    fn resolve_path(&self, value: &str) -> PathBuf {
        let path = Path::new(value);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    /// Récupère le répertoire d'archive, créé s'il n'existe pas
    pub fn get_archive_dir(&self) -> Result<PathBuf> {
        let dir = self.resolve_path(&self.get_archive_dir_setting()?);
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("cannot create archive directory {}", dir.display()))?;
            info!(directory = %dir.display(), "Created archive directory");
        }
        Ok(dir)
    }

    /// Chemin absolu du fichier SQLite
    pub fn get_database_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_path(&self.get_database_path_setting()?))
    }

    impl_string_config!(
        get_archive_dir_setting,
        &["recorder", "archive_dir"],
        DEFAULT_ARCHIVE_DIR
    );

    impl_string_config!(
        get_database_path_setting,
        &["database", "path"],
        DEFAULT_DATABASE_PATH
    );

    impl_u64_config!(
        get_prepare_after_secs,
        &["recorder", "prepare_after_secs"],
        DEFAULT_PREPARE_AFTER_SECS
    );

    impl_u64_config!(
        get_margin_secs,
        &["recorder", "margin_secs"],
        DEFAULT_MARGIN_SECS
    );

    impl_u64_config!(
        get_refresh_interval_secs,
        &["scheduler", "refresh_interval_secs"],
        DEFAULT_REFRESH_INTERVAL_SECS
    );

    impl_u64_config!(
        get_ondemand_interval_secs,
        &["scheduler", "ondemand_interval_secs"],
        DEFAULT_ONDEMAND_INTERVAL_SECS
    );

    impl_u64_config!(
        get_broadcast_interval_secs,
        &["scheduler", "broadcast_interval_secs"],
        DEFAULT_BROADCAST_INTERVAL_SECS
    );

    impl_u64_config!(
        get_ondemand_batch_size_raw,
        &["scheduler", "ondemand_batch_size"],
        DEFAULT_ONDEMAND_BATCH_SIZE as u64
    );

    impl_u64_config!(
        get_ondemand_stagger_secs,
        &["scheduler", "ondemand_stagger_secs"],
        DEFAULT_ONDEMAND_STAGGER_SECS
    );

    pub fn get_ondemand_batch_size(&self) -> Result<usize> {
        let raw = self.get_ondemand_batch_size_raw()?;
        usize::try_from(raw).context("scheduler.ondemand_batch_size is too large")
    }

    impl_bool_config!(
        get_onsen_enabled,
        &["sources", "onsen", "enabled"],
        true
    );

    impl_bool_config!(
        get_agqr_enabled,
        &["sources", "agqr", "enabled"],
        true
    );

    impl_string_config!(
        get_onsen_base_url,
        &["sources", "onsen", "base_url"],
        DEFAULT_ONSEN_BASE_URL
    );

    impl_string_config!(
        get_agqr_program_url,
        &["sources", "agqr", "program_url"],
        DEFAULT_AGQR_PROGRAM_URL
    );

    impl_string_config!(
        get_agqr_stream_url,
        &["sources", "agqr", "stream_url"],
        DEFAULT_AGQR_STREAM_URL
    );

    impl_string_config!(
        get_ffmpeg_binary,
        &["ffmpeg", "binary"],
        DEFAULT_FFMPEG
    );

    impl_string_config!(
        get_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    /// Settings handed verbatim to sources and the executor
    pub fn recorder_config(&self) -> Result<RecorderConfig> {
        Ok(RecorderConfig::new(
            self.get_archive_dir()?,
            Duration::from_secs(self.get_prepare_after_secs()?),
            Duration::from_secs(self.get_margin_secs()?),
        ))
    }

    /// Periods and ondemand limits of the periodic driver
    pub fn scheduler_settings(&self) -> Result<SchedulerSettings> {
        let settings = SchedulerSettings {
            refresh_interval: Duration::from_secs(self.get_refresh_interval_secs()?),
            ondemand_interval: Duration::from_secs(self.get_ondemand_interval_secs()?),
            broadcast_interval: Duration::from_secs(self.get_broadcast_interval_secs()?),
            ondemand_batch_size: self.get_ondemand_batch_size()?,
            ondemand_stagger: Duration::from_secs(self.get_ondemand_stagger_secs()?),
        };
        if settings.ondemand_batch_size == 0 {
            warn!("scheduler.ondemand_batch_size is 0, no on-demand program will be recorded");
        }
        Ok(settings)
    }
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    if let Value::Mapping(map) = data {
        let key_value = Value::String(path[0].to_lowercase());
        if path.len() == 1 {
            map.insert(key_value, value);
        } else {
            let entry = map
                .entry(key_value)
                .or_insert(Value::Mapping(Mapping::new()));
            set_value_internal(entry, &path[1..], value)?;
        }
        Ok(())
    } else {
        Err(anyhow!("Current node is not a map"))
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        if let Value::Mapping(map) = current {
            match map.get(&Value::String(key.to_lowercase())) {
                Some(next) => current = next,
                None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
            }
        } else {
            return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
        }
    }
    Ok(current.clone())
}

/// `PMORECORDER_CONFIG__A__B=value` sets `a.b`; values are parsed as YAML
fn apply_env_overrides(config: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, value) in vars {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let key_path = stripped.split("__").collect::<Vec<_>>();
        if let Err(err) = set_value_internal(config, &key_path, convert_env_value(&value)) {
            warn!(env_var = %key, "Ignoring environment override: {err}");
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                let new_key = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                new_map.insert(new_key, lower_keys_value(v));
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings, keys from external are merged into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}
