//! Configuration loading and config file resolution
//!
//! Settings are assembled from four sources, highest priority first:
//! 1. Command-line flags (and the environment variables clap maps onto them)
//! 2. The file named explicitly (`--config` or `EXPLORER_CONFIG`)
//! 3. The platform config file (`<config_dir>/checkpoint-explorer/config.toml`)
//! 4. Compiled defaults
//!
//! `api_base_url` has no compiled default. When no source supplies it the
//! explorer cannot fetch anything and loading fails with [`Error::Config`].

use crate::{Error, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "EXPLORER_CONFIG";

/// Directory name used under the platform config directory
pub const APP_DIR_NAME: &str = "checkpoint-explorer";

/// Seconds between automatic refreshes of the current page
pub const DEFAULT_REFRESH_INTERVAL_S: u64 = 30;

/// Rows per page on the checkpoint list
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT_S: u64 = 10;

const DEFAULT_ENVIRONMENT: &str = "development";

/// Configuration document as written on disk
///
/// Every field is optional so that a partial file can be layered under
/// command-line overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the explorer JSON API (e.g. `http://localhost:3000`)
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Base URL of the L1 (bitcoin) block explorer used for links
    #[serde(default)]
    pub l1_explorer_base_url: Option<String>,

    /// Base URL of the L2 block explorer used for links
    #[serde(default)]
    pub l2_explorer_base_url: Option<String>,

    /// Refresh interval in seconds, `0` disables periodic refresh
    #[serde(default)]
    pub refresh_interval_s: Option<u64>,

    /// Rows per page on the list view
    #[serde(default)]
    pub page_size: Option<u64>,

    /// Free-form deployment label shown in the header
    #[serde(default)]
    pub environment: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default)]
    pub request_timeout_s: Option<u64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

/// Values supplied on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub l1_explorer_base_url: Option<String>,
    pub l2_explorer_base_url: Option<String>,
    pub refresh_interval_s: Option<u64>,
    pub page_size: Option<u64>,
    pub log_level: Option<String>,
}

/// Fully resolved explorer configuration
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub api_base_url: Url,
    pub l1_explorer_base_url: Option<Url>,
    pub l2_explorer_base_url: Option<Url>,
    /// `None` when periodic refresh is disabled
    pub refresh_interval: Option<Duration>,
    pub page_size: u64,
    pub environment: String,
    pub request_timeout: Duration,
    pub logging: LoggingConfig,
}

impl ExplorerConfig {
    /// Locate, read and resolve the configuration
    ///
    /// `explicit_path` is the `--config` flag. A missing platform file is not
    /// an error; a missing explicit file or an unparseable file is.
    pub fn load(explicit_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let file_config = match ConfigFileResolver::new(explicit_path).locate()? {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                read_toml_config(&path)?
            }
            None => {
                debug!("No configuration file found, using flags and defaults");
                TomlConfig::default()
            }
        };

        Self::resolve(file_config, overrides)
    }

    /// Merge a parsed document with command-line overrides and defaults
    pub fn resolve(file: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        let api_base_url = overrides
            .api_base_url
            .or(file.api_base_url)
            .ok_or_else(|| {
                Error::Config("api_base_url is not set (use --api-base-url or a config file)".to_string())
            })
            .and_then(|raw| parse_base_url("api_base_url", &raw))?;

        let l1_explorer_base_url = overrides
            .l1_explorer_base_url
            .or(file.l1_explorer_base_url)
            .map(|raw| parse_base_url("l1_explorer_base_url", &raw))
            .transpose()?;

        let l2_explorer_base_url = overrides
            .l2_explorer_base_url
            .or(file.l2_explorer_base_url)
            .map(|raw| parse_base_url("l2_explorer_base_url", &raw))
            .transpose()?;

        let refresh_secs = overrides
            .refresh_interval_s
            .or(file.refresh_interval_s)
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_S);
        let refresh_interval = (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs));

        let page_size = overrides
            .page_size
            .or(file.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }

        let timeout_secs = file.request_timeout_s.unwrap_or(DEFAULT_REQUEST_TIMEOUT_S);
        if timeout_secs == 0 {
            return Err(Error::Config("request_timeout_s must be at least 1".to_string()));
        }

        let mut logging = file.logging;
        if let Some(level) = overrides.log_level {
            logging.level = level;
        }

        Ok(Self {
            api_base_url,
            l1_explorer_base_url,
            l2_explorer_base_url,
            refresh_interval,
            page_size,
            environment: file
                .environment
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
            logging,
        })
    }

    /// Resolve an API path (e.g. `api/checkpoints`) against the base URL
    pub fn api_url(&self, path: &str) -> Result<Url> {
        self.api_base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid API path {}: {}", path, e)))
    }
}

/// Parse a TOML configuration document
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    Ok(toml::from_str(content)?)
}

fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_toml_config(&content)
}

/// Parse a base URL and make sure it ends in `/` so that `join` appends
/// instead of replacing the last path segment.
pub fn parse_base_url(field: &str, raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    let url = Url::parse(&with_slash)
        .map_err(|e| Error::Config(format!("{} is not a valid URL ({}): {}", field, raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}

/// Config file lookup in priority order
#[derive(Debug, Clone)]
pub struct ConfigFileResolver {
    explicit: Option<PathBuf>,
}

impl ConfigFileResolver {
    pub fn new(explicit: Option<&Path>) -> Self {
        Self {
            explicit: explicit.map(Path::to_path_buf),
        }
    }

    /// Find the config file to read, if any
    ///
    /// Explicitly named files must exist. Platform locations are optional.
    pub fn locate(&self) -> Result<Option<PathBuf>> {
        // Priority 1: command-line argument
        if let Some(path) = &self.explicit {
            return require_exists(path).map(Some);
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return require_exists(Path::new(&path)).map(Some);
            }
        }

        // Priority 3: platform config locations
        Ok(platform_config_paths().into_iter().find(|p| p.exists()))
    }
}

fn require_exists(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )))
    }
}

/// Candidate config files for the current platform, most specific first
pub fn platform_config_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME).join("config.toml"))
        .into_iter()
        .collect();

    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc").join(APP_DIR_NAME).join("config.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides_with_api(url: &str) -> ConfigOverrides {
        ConfigOverrides {
            api_base_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config =
            ExplorerConfig::resolve(TomlConfig::default(), overrides_with_api("http://localhost:3000"))
                .unwrap();

        assert_eq!(config.api_base_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(
            config.refresh_interval,
            Some(Duration::from_secs(DEFAULT_REFRESH_INTERVAL_S))
        );
        assert_eq!(config.environment, "development");
        assert_eq!(config.logging.level, "info");
        assert!(config.l1_explorer_base_url.is_none());
    }

    #[test]
    fn test_missing_api_base_url_is_config_error() {
        let err = ExplorerConfig::resolve(TomlConfig::default(), ConfigOverrides::default())
            .unwrap_err();
        assert!(err.is_config_unavailable());
        assert!(err.to_string().contains("api_base_url"));
    }

    #[test]
    fn test_overrides_beat_file() {
        let file = parse_toml_config(
            r#"
            api_base_url = "http://file-host:3000"
            page_size = 25
            refresh_interval_s = 5
            "#,
        )
        .unwrap();

        let overrides = ConfigOverrides {
            api_base_url: Some("http://flag-host:4000".to_string()),
            page_size: Some(50),
            ..Default::default()
        };

        let config = ExplorerConfig::resolve(file, overrides).unwrap();
        assert_eq!(config.api_base_url.host_str(), Some("flag-host"));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.refresh_interval, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_zero_refresh_interval_disables_refresh() {
        let overrides = ConfigOverrides {
            refresh_interval_s: Some(0),
            ..overrides_with_api("http://localhost:3000")
        };
        let config = ExplorerConfig::resolve(TomlConfig::default(), overrides).unwrap();
        assert!(config.refresh_interval.is_none());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let overrides = ConfigOverrides {
            page_size: Some(0),
            ..overrides_with_api("http://localhost:3000")
        };
        assert!(ExplorerConfig::resolve(TomlConfig::default(), overrides).is_err());
    }

    #[test]
    fn test_api_url_appends_to_base_path() {
        let config = ExplorerConfig::resolve(
            TomlConfig::default(),
            overrides_with_api("https://explorer.example.org/backend"),
        )
        .unwrap();

        let url = config.api_url("/api/checkpoints").unwrap();
        assert_eq!(url.as_str(), "https://explorer.example.org/backend/api/checkpoints");
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let err = parse_base_url("api_base_url", "ftp://example.org").unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_logging_section_parsed() {
        let file = parse_toml_config(
            r#"
            api_base_url = "http://localhost:3000"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(file.logging.level, "debug");
    }

    #[test]
    fn test_unparseable_document_is_error() {
        let err = parse_toml_config("api_base_url = [").unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)));
    }
}
