//! Configuration management for Canopy.
//!
//! Configuration is read from `~/.config/canopy/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod interval;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::Category;

pub use interval::{format_interval, parse_interval};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub fetcher: FetcherConfig,
    pub cache: CacheConfig,
    pub thread: ThreadConfig,
    pub scanner: ScannerConfig,
    pub refresher: RefresherConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root of the item API, without a trailing slash
    pub base_url: String,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hacker-news.firebaseio.com/v0".to_string(),
            user_agent: format!("canopy/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Remote calls allowed in flight at once, across all callers
    pub max_concurrency: usize,
    /// Absolute timeout for a single remote call
    pub timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            timeout_secs: 30,
        }
    }
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long assembled pages and comment trees are served without refetching
    pub freshness_secs: u64,
    /// Keep assembled pages in the SQLite database
    pub persist: bool,
    /// Database location; defaults to the platform data directory
    pub db_path: Option<PathBuf>,
    /// Consult the item index before going to the network
    pub look_aside: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_secs: 300,
            persist: true,
            db_path: None,
            look_aside: true,
        }
    }
}

impl CacheConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    /// Bound on comment nesting and parent-chain walks
    pub max_depth: usize,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub workers: usize,
    pub deadline_secs: u64,
    pub limit: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            deadline_secs: 30,
            limit: 30,
        }
    }
}

impl ScannerConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefresherConfig {
    /// Interval between ticks, e.g. "2m", "90s", "1h"
    pub interval: String,
    /// Categories visited in rotation, one per tick
    pub categories: Vec<Category>,
    pub per_page: usize,
    pub refresh_on_start: bool,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            interval: "2m".to_string(),
            categories: Category::ROTATION.to_vec(),
            per_page: 30,
            refresh_on_start: false,
        }
    }
}

impl RefresherConfig {
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        parse_interval(&self.interval)
            .map(Duration::from_secs)
            .map_err(ConfigError::Invalid)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/canopy/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("canopy").join("config.toml"))
    }

    /// Database path from config, or `<data dir>/canopy/canopy.db`.
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.cache.db_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join("canopy").join("canopy.db"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fetcher.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "fetcher.max_concurrency must be at least 1".into(),
            ));
        }
        if self.scanner.workers == 0 {
            return Err(ConfigError::Invalid("scanner.workers must be at least 1".into()));
        }
        if self.refresher.categories.is_empty() {
            return Err(ConfigError::Invalid(
                "refresher.categories must not be empty".into(),
            ));
        }
        self.refresher.interval()?;
        Ok(())
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Canopy Configuration

[api]
# Root of the item API
base_url = "https://hacker-news.firebaseio.com/v0"

[fetcher]
# Remote calls allowed in flight at once
max_concurrency = 3

# Timeout for a single remote call, in seconds
timeout_secs = 30

[cache]
# Seconds an assembled page or comment tree is served before refetching
freshness_secs = 300

# Keep assembled pages in a local SQLite database
persist = true

# Database location (default: platform data directory)
# db_path = "/var/lib/canopy/canopy.db"

# Look items up in the local index before fetching them
look_aside = true

[thread]
# Maximum comment nesting / parent chain length followed
max_depth = 100

[scanner]
# Concurrent workers scanning the newest items
workers = 5

# Seconds before a scan for new comments gives up
deadline_secs = 30

# Number of comments collected per scan
limit = 30

[refresher]
# Interval between background refreshes ("90s", "2m", "1h")
interval = "2m"

# Categories refreshed in rotation, one per tick
categories = [
    "topstories",
    "newstories",
    "beststories",
    "askstories",
    "showstories",
    "jobstories",
]

# Stories per refreshed page
per_page = 30

# Run a refresh immediately on start
refresh_on_start = false
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.fetcher.max_concurrency, 3);
        assert_eq!(config.cache.freshness_secs, 300);
        assert_eq!(config.refresher.categories, Category::ROTATION.to_vec());
        assert_eq!(config.refresher.interval().unwrap(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[fetcher]
max_concurrency = 8

[refresher]
categories = ["ask", "show"]
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.fetcher.max_concurrency, 8);
        assert_eq!(config.fetcher.timeout_secs, 30);
        assert_eq!(config.refresher.categories, vec![Category::Ask, Category::Show]);
        assert_eq!(config.scanner.workers, 5);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.thread.max_depth, 100);
        assert_eq!(config.scanner.deadline(), Duration::from_secs(30));
        assert!(config.cache.persist);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fetcher]\nmax_concurrency = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[refresher]\ncategories = [\"frontpage\"]\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_explicit_db_path() {
        let mut config = Config::default();
        config.cache.db_path = Some(PathBuf::from("/tmp/canopy-test.db"));
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/canopy-test.db"));
    }
}
