//! Configuration management for gatecheck.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "gatecheck";

/// Default scan history database file name.
const DATABASE_FILE_NAME: &str = "scans.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `GATECHECK_`, with `__` separating
///    the section from the key, e.g. `GATECHECK_SHEET__SPREADSHEET_ID`)
/// 2. TOML config file at `~/.config/gatecheck/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote sheet configuration.
    pub sheet: SheetConfig,
    /// Live watch mode configuration.
    pub watch: WatchConfig,
    /// Local scan history configuration.
    pub history: HistoryConfig,
}

/// Remote sheet configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Base URL of the sheet API.
    pub endpoint: String,
    /// Identifier of the spreadsheet holding the roster.
    pub spreadsheet_id: String,
    /// Name of the worksheet within the spreadsheet.
    pub worksheet: String,
    /// Name of the environment variable holding the API bearer token.
    pub token_env: String,
    /// Optional regex an extracted identifier must match.
    pub id_pattern: Option<String>,
    /// HTTP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// HTTP request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

/// Live watch mode configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory the frame source polls for new images.
    /// Defaults to `~/.local/share/gatecheck/spool`
    pub spool_dir: Option<PathBuf>,
    /// Interval between directory polls in milliseconds.
    pub poll_interval_ms: u64,
    /// File extensions treated as image frames.
    pub extensions: Vec<String>,
    /// How long (in seconds) a payload hash suppresses re-processing of the
    /// same payload. Set to 0 to disable deduplication.
    pub dedup_window_secs: u64,
}

/// Local scan history configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Path to the scan history database file.
    /// Defaults to `~/.local/share/gatecheck/scans.db`
    pub database_path: Option<PathBuf>,
    /// Maximum number of scan records to retain.
    /// Set to 0 for unlimited.
    pub max_records: usize,
    /// Maximum age of scan records to retain in days.
    /// Set to 0 for unlimited.
    pub max_age_days: u32,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
            spreadsheet_id: String::new(),
            worksheet: "Sheet1".to_string(),
            token_env: "GATECHECK_SHEET_TOKEN".to_string(),
            id_pattern: None,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            spool_dir: None, // Will be resolved to default at runtime
            poll_interval_ms: 500,
            extensions: default_frame_extensions(),
            dedup_window_secs: 300,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_records: 10_000,
            max_age_days: 90,
        }
    }
}

/// Default file extensions treated as image frames.
fn default_frame_extensions() -> Vec<String> {
    vec![
        "png".to_string(),
        "jpg".to_string(),
        "jpeg".to_string(),
        "bmp".to_string(),
    ]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (`GATECHECK_<SECTION>__<KEY>`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("GATECHECK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.watch.poll_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.watch.extensions.is_empty() {
            return Err(Error::ConfigValidation {
                message: "watch.extensions must not be empty".to_string(),
            });
        }

        if self.sheet.token_env.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "sheet.token_env must not be empty".to_string(),
            });
        }

        if let Some(pattern) = &self.sheet.id_pattern {
            if regex::Regex::new(pattern).is_err() {
                return Err(Error::ConfigValidation {
                    message: format!("invalid id_pattern regex: {pattern}"),
                });
            }
        }

        Ok(())
    }

    /// Validate the parts of the configuration required to reach the remote sheet.
    ///
    /// Commands that never touch the remote roster (e.g. `history`) skip this.
    ///
    /// # Errors
    ///
    /// Returns an error if the sheet endpoint, spreadsheet id, or worksheet
    /// name is unset.
    pub fn validate_remote(&self) -> Result<()> {
        if self.sheet.endpoint.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "sheet.endpoint must not be empty".to_string(),
            });
        }
        if self.sheet.spreadsheet_id.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "sheet.spreadsheet_id must be set".to_string(),
            });
        }
        if self.sheet.worksheet.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "sheet.worksheet must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Get the scan history database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.history
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the spool directory, resolving defaults if not set.
    #[must_use]
    pub fn spool_dir(&self) -> PathBuf {
        self.watch
            .spool_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("spool"))
    }

    /// Get the compiled identifier pattern, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured pattern does not compile. `validate`
    /// catches this at load time, so this only fails on a hand-built config.
    pub fn id_regex(&self) -> Result<Option<regex::Regex>> {
        match &self.sheet.id_pattern {
            None => Ok(None),
            Some(pattern) => regex::Regex::new(pattern).map(Some).map_err(|_| {
                Error::ConfigValidation {
                    message: format!("invalid id_pattern regex: {pattern}"),
                }
            }),
        }
    }

    /// Get the watch poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch.poll_interval_ms)
    }

    /// Get the watch dedup window, or `None` when deduplication is disabled.
    #[must_use]
    pub fn dedup_window(&self) -> Option<Duration> {
        if self.watch.dedup_window_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.watch.dedup_window_secs))
        }
    }

    /// Get the history max age as a Duration.
    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        if self.history.max_age_days == 0 {
            None
        } else {
            Some(Duration::from_secs(
                u64::from(self.history.max_age_days) * 24 * 60 * 60,
            ))
        }
    }
}

impl SheetConfig {
    /// Read the API bearer token from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialsMissing`] if the variable is unset or empty.
    pub fn token(&self) -> Result<String> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(Error::CredentialsMissing {
                env_var: self.token_env.clone(),
            }),
        }
    }

    /// Get the HTTP connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get the HTTP request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
