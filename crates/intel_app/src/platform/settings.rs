use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use intel_core::{
    ResponseOrdering, SourceId, SyncConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE,
    DEFAULT_POLL_INTERVAL,
};
use intel_engine::ApiSettings;
use log::LevelFilter;
use serde::Deserialize;
use url::Url;

use super::logging::LogDestination;

/// Environment variable consulted for the backend address when no
/// `--base-url` is given.
pub const BASE_URL_ENV: &str = "INTEL_API_BASE";

#[derive(Debug, Parser)]
#[command(name = "intel", about = "Terminal dashboard for monitored channels", version)]
pub struct Args {
    /// Backend base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// RON settings file
    #[arg(long, default_value = "intel.ron")]
    pub settings: PathBuf,

    /// Show the item feed of this source instead of the source list
    #[arg(long)]
    pub source: Option<SourceId>,

    /// Run a single fetch cycle, print it and exit
    #[arg(long)]
    pub once: bool,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Rows per page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Where log output goes
    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingSetting {
    #[default]
    Issue,
    Arrival,
}

impl From<OrderingSetting> for ResponseOrdering {
    fn from(setting: OrderingSetting) -> Self {
        match setting {
            OrderingSetting::Issue => ResponseOrdering::IssueOrder,
            OrderingSetting::Arrival => ResponseOrdering::ArrivalOrder,
        }
    }
}

/// Contents of the settings file. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: Option<String>,
    pub poll_interval_ms: u64,
    pub page_size: u32,
    pub ordering: OrderingSetting,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_body_bytes: u64,
    pub log: LogDestination,
    pub log_level: String,
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let api = ApiSettings::default();
        Self {
            base_url: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            page_size: DEFAULT_PAGE_SIZE as u32,
            ordering: OrderingSetting::default(),
            connect_timeout_ms: api.connect_timeout.as_millis() as u64,
            request_timeout_ms: api.request_timeout.as_millis() as u64,
            max_body_bytes: api.max_body_bytes,
            log: LogDestination::default(),
            log_level: "info".to_string(),
            log_file: PathBuf::from("./intel.log"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not read settings from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse settings from {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("invalid base url {url:?}: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("unknown log level {0:?}")]
    LogLevel(String),
}

impl Settings {
    /// Reads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        ron::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Everything the app needs after merging flags, environment and file.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub sync: SyncConfig,
    pub api: ApiSettings,
    pub log: LogDestination,
    pub level: LevelFilter,
    pub log_file: PathBuf,
    pub source: Option<SourceId>,
    pub once: bool,
}

/// Flags win over the environment, which wins over the file.
pub fn resolve(
    args: &Args,
    settings: &Settings,
    env_base_url: Option<String>,
) -> Result<Resolved, SettingsError> {
    let raw_url = args
        .base_url
        .clone()
        .or(env_base_url.filter(|value| !value.trim().is_empty()))
        .or_else(|| settings.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = Url::parse(raw_url.trim()).map_err(|source| SettingsError::BaseUrl {
        url: raw_url.clone(),
        source,
    })?;

    let level = match args.verbose {
        0 => LevelFilter::from_str(settings.log_level.trim())
            .map_err(|_| SettingsError::LogLevel(settings.log_level.clone()))?,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let sync = SyncConfig {
        page_size: args.page_size.unwrap_or(settings.page_size).max(1),
        poll_interval: Duration::from_millis(
            args.poll_interval_ms.unwrap_or(settings.poll_interval_ms),
        ),
        base_url: base_url.clone(),
        ordering: settings.ordering.into(),
    };
    let api = ApiSettings {
        base_url,
        connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
        request_timeout: Duration::from_millis(settings.request_timeout_ms),
        max_body_bytes: settings.max_body_bytes,
    };

    Ok(Resolved {
        sync,
        api,
        log: args.log.unwrap_or(settings.log),
        level,
        log_file: args
            .log_file
            .clone()
            .unwrap_or_else(|| settings.log_file.clone()),
        source: args.source,
        once: args.once,
    })
}
