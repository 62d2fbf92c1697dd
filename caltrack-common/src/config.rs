//! Configuration loading and resolution
//!
//! Priority for every setting, highest first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! Secrets (Mailgun API key, trigger secret) are read from the environment
//! only and never from the TOML file.

use chrono::{FixedOffset, NaiveTime, Weekday};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::time::offset_from_minutes;
use crate::{Error, Result};

/// Environment variable holding the Mailgun API key
pub const MAILGUN_API_KEY_ENV: &str = "MAILGUN_API_KEY";

/// Environment variable holding the manual-trigger shared secret
pub const TRIGGER_SECRET_ENV: &str = "CALTRACK_TRIGGER_SECRET";

/// Environment variable overriding the database path
pub const DATABASE_PATH_ENV: &str = "CALTRACK_DATABASE_PATH";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "CALTRACK_CONFIG";

/// Contents of `caltrack.toml`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub bind_address: String,
    /// Sender identity domain: `cal@{slug}.{mail_domain}`
    pub mail_domain: String,
    pub schedule: ScheduleConfig,
    pub delivery: DeliveryConfig,
    pub enforcement: EnforcementConfig,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            bind_address: "127.0.0.1:5780".to_string(),
            mail_domain: "gp3.app".to_string(),
            schedule: ScheduleConfig::default(),
            delivery: DeliveryConfig::default(),
            enforcement: EnforcementConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[schedule]`: trigger times in the operational timezone
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Operational timezone as minutes east of UTC
    pub utc_offset_minutes: i32,
    pub status_refresh: String,
    pub daily_enforcement: String,
    pub weekly_summary_day: String,
    pub weekly_summary: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: -300,
            status_refresh: "05:45".to_string(),
            daily_enforcement: "06:00".to_string(),
            weekly_summary_day: "mon".to_string(),
            weekly_summary: "07:00".to_string(),
        }
    }
}

/// `[delivery]`: Mailgun transport settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub mailgun_domain: String,
    pub mailgun_base_url: String,
    /// Per-attempt timeout
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mailgun_domain: "gp3.app".to_string(),
            mailgun_base_url: "https://api.mailgun.net/v3".to_string(),
            timeout_secs: 15,
        }
    }
}

/// `[enforcement]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    /// Skip a tier message already sent today for the same equipment set
    pub dedupe_same_day: bool,
}

/// `[logging]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Load the config file; a missing file yields defaults with a warning
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::parse(&content)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Trigger times and timezone after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationalSchedule {
    pub offset: FixedOffset,
    pub status_refresh: NaiveTime,
    pub daily_enforcement: NaiveTime,
    pub weekly_summary_day: Weekday,
    pub weekly_summary: NaiveTime,
}

impl ScheduleConfig {
    /// Validate and convert
    ///
    /// The status refresh must come strictly before the daily enforcement
    /// scan on the same day.
    pub fn resolve(&self) -> Result<OperationalSchedule> {
        let offset = offset_from_minutes(self.utc_offset_minutes).ok_or_else(|| {
            Error::Config(format!("utc_offset_minutes out of range: {}", self.utc_offset_minutes))
        })?;
        let status_refresh = parse_time("status_refresh", &self.status_refresh)?;
        let daily_enforcement = parse_time("daily_enforcement", &self.daily_enforcement)?;
        let weekly_summary = parse_time("weekly_summary", &self.weekly_summary)?;
        let weekly_summary_day: Weekday = self.weekly_summary_day.trim().parse().map_err(|_| {
            Error::Config(format!("weekly_summary_day is not a weekday: {}", self.weekly_summary_day))
        })?;

        if status_refresh >= daily_enforcement {
            return Err(Error::Config(format!(
                "status_refresh ({status_refresh}) must be earlier than daily_enforcement ({daily_enforcement})"
            )));
        }

        Ok(OperationalSchedule {
            offset,
            status_refresh,
            daily_enforcement,
            weekly_summary_day,
            weekly_summary,
        })
    }
}

fn parse_time(key: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| Error::Config(format!("{key} is not HH:MM: {value:?}")))
}

/// Config file location: CLI → `CALTRACK_CONFIG` → `./caltrack.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Some(path) = read_env(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from("caltrack.toml")
}

/// Database location: CLI → `CALTRACK_DATABASE_PATH` → TOML → platform default
pub fn resolve_database_path(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Some(path) = read_env(DATABASE_PATH_ENV) {
        return PathBuf::from(path);
    }
    if let Some(path) = &toml.database_path {
        return path.clone();
    }
    default_database_path()
}

fn default_database_path() -> PathBuf {
    if cfg!(target_os = "linux") {
        PathBuf::from("/var/lib/caltrack/caltrack.db")
    } else {
        PathBuf::from("./caltrack_data/caltrack.db")
    }
}

/// Non-empty, trimmed environment value
pub fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
