//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables prefixed with `LUCKY_SEARCH_` (nested keys are
//! separated by `__`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [search]
//! default_page_size = 20
//! default_max_results = 100
//!
//! [sources.openalex]
//! enabled = true
//! base_url = "https://api.openalex.org"
//! mailto = "you@example.org"
//! timeout_secs = 10
//! max_page_size = 200
//!
//! [sources.crossref]
//! enabled = true
//! base_url = "https://api.crossref.org"
//! mailto = "you@example.org"
//! timeout_secs = 10
//! max_page_size = 1000
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Environment Overrides
//!
//! ```bash
//! export LUCKY_SEARCH_SOURCES__CROSSREF__MAILTO="you@example.org"
//! export LUCKY_SEARCH_SOURCES__OPENALEX__ENABLED=false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{DEFAULT_MAX_RESULTS, DEFAULT_PAGE_SIZE};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "LUCKY_SEARCH";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Request defaults for the CLI
    #[serde(default)]
    pub search: SearchConfig,

    /// Per-source settings
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Request defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            default_max_results: default_max_results(),
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

/// Settings for every source, keyed by source id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub openalex: OpenAlexConfig,

    #[serde(default)]
    pub crossref: CrossrefConfig,
}

/// OpenAlex adapter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAlexConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API root, without the `/works` path
    #[serde(default = "default_openalex_url")]
    pub base_url: String,

    /// Contact address for the polite pool (default: `OPENALEX_EMAIL`)
    #[serde(default = "default_openalex_mailto")]
    pub mailto: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest `per-page` the API accepts
    #[serde(default = "default_openalex_page_size")]
    pub max_page_size: usize,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_openalex_url(),
            mailto: default_openalex_mailto(),
            timeout_secs: default_timeout_secs(),
            max_page_size: default_openalex_page_size(),
        }
    }
}

impl OpenAlexConfig {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of the works search endpoint
    pub fn works_url(&self) -> String {
        format!("{}/works", self.base_url.trim_end_matches('/'))
    }
}

fn default_openalex_url() -> String {
    "https://api.openalex.org".to_string()
}

fn default_openalex_mailto() -> Option<String> {
    std::env::var("OPENALEX_EMAIL").ok().filter(|m| !m.is_empty())
}

fn default_openalex_page_size() -> usize {
    200
}

/// Crossref adapter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossrefConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API root, without the `/works` path
    #[serde(default = "default_crossref_url")]
    pub base_url: String,

    /// Contact address for the polite pool (default: `CROSSREF_MAILTO`)
    #[serde(default = "default_crossref_mailto")]
    pub mailto: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest `rows` the API accepts
    #[serde(default = "default_crossref_page_size")]
    pub max_page_size: usize,
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_crossref_url(),
            mailto: default_crossref_mailto(),
            timeout_secs: default_timeout_secs(),
            max_page_size: default_crossref_page_size(),
        }
    }
}

impl CrossrefConfig {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of the works search endpoint
    pub fn works_url(&self) -> String {
        format!("{}/works", self.base_url.trim_end_matches('/'))
    }
}

fn default_crossref_url() -> String {
    "https://api.crossref.org".to_string()
}

fn default_crossref_mailto() -> Option<String> {
    std::env::var("CROSSREF_MAILTO").ok().filter(|m| !m.is_empty())
}

fn default_crossref_page_size() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment())
        .build()?;

    settings.try_deserialize()
}

/// Get the configuration from environment variables and defaults
pub fn get_config() -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(environment())
        .build()?;

    settings.try_deserialize()
}

/// Find a configuration file in the default locations.
///
/// Checks `./lucky-search.toml`, then `<config dir>/lucky-search/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("lucky-search.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("lucky-search").join("config.toml"))
        .filter(|path| path.is_file())
}
