use crate::constants::USER_AGENT;
use crate::constants::intervals::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MIN_REFRESH};
use crate::parser::NumberingScheme;
use crate::quality::Quality;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub scheduler: SchedulerConfig,

    pub qbittorrent: QBittorrentConfig,

    pub observability: ObservabilityConfig,

    /// Feed sources, most preferred first.
    pub sources: Vec<SourceConfig>,

    pub shows: Vec<ShowConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    pub log_format: LogFormat,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// User agent sent with feed requests.
    pub user_agent: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            worker_threads: 2,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    pub check_interval_minutes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QBittorrentConfig {
    pub enabled: bool,

    pub url: String,

    pub username: String,

    pub password: String,

    pub category: String,

    pub save_path: Option<String>,
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8080".to_string(),
            username: "change-me".to_string(),
            password: "change-me".to_string(),
            category: "tv".to_string(),
            save_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_port: 9464,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Torrent,
    ShowRss,
}

impl SourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Torrent => "torrent",
            Self::ShowRss => "showrss",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub name: String,

    pub kind: SourceKind,

    pub url: String,

    pub enabled: bool,

    pub numbering: NumberingScheme,

    /// Minimum seconds between two fetches of this feed (default: 900)
    pub min_refresh_secs: u64,

    /// Seconds before a fetch is abandoned (default: 30)
    pub fetch_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: SourceKind::default(),
            url: String::new(),
            enabled: true,
            numbering: NumberingScheme::default(),
            min_refresh_secs: DEFAULT_MIN_REFRESH.as_secs(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowConfig {
    /// External series id, e.g. the TVDB id.
    pub id: u32,

    pub name: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default = "default_true")]
    pub monitored: bool,

    /// Accepted qualities; empty accepts any.
    #[serde(default)]
    pub qualities: Vec<String>,
}

const fn default_true() -> bool {
    true
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("showarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".showarr").join("config.toml"));
        }

        paths
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Writes the starter config to `path` unless a file is already there.
    /// Returns whether a file was written.
    pub fn create_default_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            Ok(false)
        } else {
            Self::starter().save_to_path(path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Defaults plus one disabled example of each section list, so the
    /// written file documents the shape of sources and shows.
    #[must_use]
    pub fn starter() -> Self {
        Self {
            sources: vec![SourceConfig {
                name: "showrss".to_string(),
                kind: SourceKind::ShowRss,
                url: "https://showrss.info/other/all.rss".to_string(),
                enabled: false,
                ..Default::default()
            }],
            shows: vec![ShowConfig {
                id: 0,
                name: "Example Show".to_string(),
                aliases: Vec::new(),
                monitored: false,
                qualities: vec!["720p".to_string(), "1080p".to_string()],
            }],
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.qbittorrent.enabled {
            if self.qbittorrent.url.is_empty() {
                bail!("qBittorrent URL cannot be empty when enabled");
            }
            Url::parse(&self.qbittorrent.url).with_context(|| {
                format!("Invalid qBittorrent URL: {}", self.qbittorrent.url)
            })?;
        }

        if self.scheduler.enabled && self.scheduler.check_interval_minutes == 0 {
            bail!("Scheduler interval must be > 0");
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                bail!("Every source needs a name");
            }
            if !names.insert(source.name.as_str()) {
                bail!("Duplicate source name '{}'", source.name);
            }
            Url::parse(&source.url)
                .with_context(|| format!("Invalid URL for source '{}': {}", source.name, source.url))?;
            if source.min_refresh_secs == 0 {
                bail!("Source '{}': min_refresh_secs must be > 0", source.name);
            }
            if source.fetch_timeout_secs == 0 {
                bail!("Source '{}': fetch_timeout_secs must be > 0", source.name);
            }
        }

        let mut ids = HashSet::new();
        for show in &self.shows {
            if show.name.trim().is_empty() {
                bail!("Show {} needs a name", show.id);
            }
            if !ids.insert(show.id) {
                bail!("Duplicate show id {}", show.id);
            }
            for quality in &show.qualities {
                quality.parse::<Quality>().with_context(|| {
                    format!("Show '{}': unknown quality '{quality}'", show.name)
                })?;
            }
        }

        Ok(())
    }
}
