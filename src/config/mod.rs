//! Configuration management.
//!
//! Configuration comes from an optional TOML file plus environment
//! overrides prefixed with `HISTORICAL_SEARCH__` (nested keys separated by
//! `__`, e.g. `HISTORICAL_SEARCH__TIMEOUTS__SEARCH_SECS=20`). API keys also
//! fall back to the conventional `NYT_API_KEY` / `GUARDIAN_API_KEY` variables.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! nyt = "your-nyt-key"
//! guardian = "your-guardian-key"
//!
//! [gdelt]
//! project_id = "my-gcp-project"
//! access_token = "ya29...."
//! table = "gdelt-bq.full.events"
//!
//! [endpoints]
//! cdx = "https://web.archive.org/cdx/search/cdx"
//!
//! [timeouts]
//! search_secs = 10
//! availability_secs = 5
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up by [`find_config_file`]
pub const CONFIG_FILE_NAME: &str = "historical-search.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API keys for the article search services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Event warehouse settings
    #[serde(default)]
    pub gdelt: GdeltConfig,

    /// Endpoint overrides
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Per-request timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API keys for external services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeys {
    /// NYT Article Search key
    #[serde(default = "env_nyt_key")]
    pub nyt: Option<String>,

    /// Guardian Open Platform key
    #[serde(default = "env_guardian_key")]
    pub guardian: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            nyt: env_nyt_key(),
            guardian: env_guardian_key(),
        }
    }
}

fn env_nyt_key() -> Option<String> {
    non_empty_env("NYT_API_KEY")
}

fn env_guardian_key() -> Option<String> {
    non_empty_env("GUARDIAN_API_KEY")
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// GDELT warehouse configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdeltConfig {
    /// Project billed for the queries
    #[serde(default = "env_gdelt_project")]
    pub project_id: Option<String>,

    /// OAuth access token
    #[serde(default = "env_gdelt_token")]
    pub access_token: Option<String>,

    /// Events table (default `gdelt-bq.full.events`)
    #[serde(default)]
    pub table: Option<String>,
}

impl Default for GdeltConfig {
    fn default() -> Self {
        Self {
            project_id: env_gdelt_project(),
            access_token: env_gdelt_token(),
            table: None,
        }
    }
}

impl GdeltConfig {
    /// Project and token, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.project_id, &self.access_token) {
            (Some(project), Some(token)) => Some((project.as_str(), token.as_str())),
            _ => None,
        }
    }
}

fn env_gdelt_project() -> Option<String> {
    non_empty_env("GDELT_PROJECT_ID")
}

fn env_gdelt_token() -> Option<String> {
    non_empty_env("GDELT_ACCESS_TOKEN")
}

/// Endpoint overrides, for mirrors and testing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub cdx: Option<String>,

    #[serde(default)]
    pub chronicling_america: Option<String>,

    #[serde(default)]
    pub nyt: Option<String>,

    #[serde(default)]
    pub guardian: Option<String>,

    #[serde(default)]
    pub availability: Option<String>,

    #[serde(default)]
    pub bigquery: Option<String>,
}

/// Per-request timeouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Full search queries
    #[serde(default = "default_search_secs")]
    pub search_secs: u64,

    /// Availability lookups
    #[serde(default = "default_availability_secs")]
    pub availability_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            search_secs: default_search_secs(),
            availability_secs: default_availability_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn availability(&self) -> Duration {
        Duration::from_secs(self.availability_secs)
    }
}

fn default_search_secs() -> u64 {
    10
}

fn default_availability_secs() -> u64 {
    5
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
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

/// Configuration save errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

impl Config {
    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("HISTORICAL_SEARCH").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Get the configuration from environment variables and defaults only
pub fn get_config() -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix("HISTORICAL_SEARCH").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Look for a configuration file in the working directory, then in the
/// platform config directory (`~/.config/historical-search/config.toml` on
/// Linux).
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("historical-search").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timeouts.search(), Duration::from_secs(10));
        assert_eq!(config.timeouts.availability(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "info");
        assert!(config.endpoints.cdx.is_none());
    }

    #[test]
    fn test_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
[api_keys]
nyt = "nyt-key"
guardian = "guardian-key"

[gdelt]
project_id = "research-project"
access_token = "token"

[endpoints]
cdx = "http://localhost:9000/cdx"

[timeouts]
search_secs = 30
"#;

        let mut file = File::create(&path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.api_keys.nyt.as_deref(), Some("nyt-key"));
        assert_eq!(config.api_keys.guardian.as_deref(), Some("guardian-key"));
        assert_eq!(
            config.gdelt.credentials(),
            Some(("research-project", "token"))
        );
        assert_eq!(config.endpoints.cdx.as_deref(), Some("http://localhost:9000/cdx"));
        assert_eq!(config.timeouts.search_secs, 30);
        assert_eq!(config.timeouts.availability_secs, 5);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.api_keys.nyt = Some("saved-key".to_string());
        config.timeouts.availability_secs = 2;
        config.save(&path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.api_keys.nyt.as_deref(), Some("saved-key"));
        assert_eq!(loaded.timeouts.availability_secs, 2);
    }

    #[test]
    fn test_load_nonexistent() {
        let result = load_config(Path::new("/nonexistent/historical-search.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_gdelt_credentials_need_both_parts() {
        let gdelt = GdeltConfig {
            project_id: Some("project".into()),
            access_token: None,
            table: None,
        };
        assert!(gdelt.credentials().is_none());
    }
}
