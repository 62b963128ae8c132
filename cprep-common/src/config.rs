//! Configuration loading and root folder resolution
//!
//! Values resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CPREP_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the platform session cookie
pub const ENV_SESSION: &str = "CPREP_SESSION";
/// Environment variable holding the platform CSRF token
pub const ENV_CSRF: &str = "CPREP_CSRF";
/// Environment variable overriding the platform base URL
pub const ENV_BASE_URL: &str = "CPREP_BASE_URL";
/// Environment variable overriding the root data folder
pub const ENV_ROOT_FOLDER: &str = "CPREP_ROOT_FOLDER";
/// Environment variable holding an optional GitHub token for feed downloads
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "cprep.db";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub source: SourceConfig,
    pub readiness: ReadinessConfig,
    pub ingest: IngestConfig,
    pub feed: FeedConfig,
    pub server: ServerConfig,
}

/// Remote platform client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Platform origin; the GraphQL endpoint lives at `{base_url}/graphql/`
    pub base_url: String,
    pub session_token: Option<String>,
    pub csrf_token: Option<String>,
    /// Page size for skip/limit pagination
    pub page_size: u32,
    /// Page size for the submission list (the platform caps it at 20)
    pub submission_page_size: u32,
    /// Courtesy delay between paginated requests
    pub page_delay_ms: u64,
    /// Courtesy delay between per-slug title lookups
    pub title_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_retries: u32,
    /// Backoff before retry n is `backoff_base_ms * 2^n`
    pub backoff_base_ms: u64,
    pub retry_statuses: Vec<u16>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://leetcode.com".to_string(),
            session_token: None,
            csrf_token: None,
            page_size: 100,
            submission_page_size: 20,
            page_delay_ms: 500,
            title_delay_ms: 150,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            max_retries: 5,
            backoff_base_ms: 1500,
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

/// Readiness scoring constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Size of each company's core set
    pub target: usize,
    /// Per-problem frequency weight cap
    pub frequency_cap: u64,
    pub floor: u32,
    pub ceiling: u32,
    /// Number of companies returned
    pub top_k: usize,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            target: 120,
            frequency_cap: 15,
            floor: 15,
            ceiling: 92,
            top_k: 12,
        }
    }
}

/// CSV ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Folder holding one CSV per company
    pub csv_dir: PathBuf,
    /// Compare-and-set attempts per slug before giving up
    pub merge_max_attempts: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("companies_csv"),
            merge_max_attempts: 5,
        }
    }
}

/// Company CSV feed, served through the GitHub contents API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    /// Folder inside the repository holding one CSV per company
    pub path: String,
    /// Unauthenticated requests get a much lower rate limit
    pub token: Option<String>,
    pub listing_timeout_secs: u64,
    pub file_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: "hxu296".to_string(),
            repo: "leetcode-company-wise-problems-2022".to_string(),
            path: "companies".to_string(),
            token: None,
            listing_timeout_secs: 30,
            file_timeout_secs: 60,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5780".to_string(),
        }
    }
}

impl TomlConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, the platform
    /// default locations are tried; if none exist, defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_file() {
                Some(path) => path,
                None => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Apply `CPREP_*` and `GITHUB_TOKEN` environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Some(token) = non_empty_env(ENV_SESSION) {
            self.source.session_token = Some(token);
        }
        if let Some(token) = non_empty_env(ENV_CSRF) {
            self.source.csrf_token = Some(token);
        }
        if let Some(url) = non_empty_env(ENV_BASE_URL) {
            self.source.base_url = url;
        }
        if let Some(token) = non_empty_env(ENV_GITHUB_TOKEN) {
            self.feed.token = Some(token);
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Root folder resolution:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `root_folder` from the TOML config
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = non_empty_env(env_var_name) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// User-Agent sent to the remote platform
pub fn get_user_agent() -> String {
    format!("cprep/{} (+https://github.com/cprep/cprep)", env!("CARGO_PKG_VERSION"))
}

/// First existing config file among the platform default locations
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("cprep").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/cprep/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/cprep (or /var/lib/cprep for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("cprep"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/cprep"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("cprep"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/cprep"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("cprep"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\cprep"))
    } else {
        PathBuf::from("./cprep_data")
    }
}
