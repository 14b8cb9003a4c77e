use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default minimum gap between two accepted records for one identity.
pub const DEFAULT_COOLDOWN_SECS: i64 = 30 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cooldown must be a positive number of seconds, got {0}")]
    InvalidCooldown(i64),
}

/// Recorder configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one `YYYY-MM-DD.csv` ledger per day.
    pub log_dir: PathBuf,
    /// Minimum time between two accepted records for the same identity.
    pub cooldown: Duration,
}

/// Optional TOML file named by `ROLLCALL_CONFIG`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    log_dir: Option<PathBuf>,
    cooldown_secs: Option<i64>,
}

impl Config {
    /// Load configuration: defaults, then the `ROLLCALL_CONFIG` TOML file if
    /// set, then `ROLLCALL_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an injectable environment.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let file = match env("ROLLCALL_CONFIG") {
            Some(path) => read_file(Path::new(&path))?,
            None => FileConfig::default(),
        };

        let log_dir = env("ROLLCALL_LOG_DIR")
            .map(PathBuf::from)
            .or(file.log_dir)
            .unwrap_or_else(|| default_log_dir(&env));

        let cooldown_secs = env_i64(&env, "ROLLCALL_COOLDOWN_SECS")
            .or(file.cooldown_secs)
            .unwrap_or(DEFAULT_COOLDOWN_SECS);

        Ok(Self {
            log_dir,
            cooldown: cooldown_from_secs(cooldown_secs)?,
        })
    }
}

/// Validate a cooldown given in seconds.
pub fn cooldown_from_secs(secs: i64) -> Result<Duration, ConfigError> {
    Duration::try_seconds(secs)
        .filter(|d| *d > Duration::zero())
        .ok_or(ConfigError::InvalidCooldown(secs))
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn default_log_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = env("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
        .join("logs")
}

fn env_i64(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<i64> {
    env(key).and_then(|v| v.trim().parse().ok())
}
