//! Configuration loading and resolution
//!
//! Every option resolves in priority order:
//! 1. Command-line argument (applied by the binary via [`EngineConfig::apply_cli`])
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing TOML file is not an error: a warning is logged and defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATE_TTL_DAYS: u32 = 30;
pub const DEFAULT_MAX_STATE_SIZE_MB: u64 = 10;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LOCK_STALE_MS: u64 = 30_000;
pub const DEFAULT_LOCK_POLL_MS: u64 = 100;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ZOHO_BASE_URL: &str = "https://api.zohosprints.com/zsapi";
pub const DEFAULT_COLLABORATOR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TRACKER_DELAY_MS: u64 = 100;

const STATE_FILE_NAME: &str = "state.json";
const LOCK_FILE_NAME: &str = "state.lock";
const LOCAL_TASKS_FILE_NAME: &str = "local_tasks.json";

// ============================================================================
// TOML schema
// ============================================================================

/// On-disk TOML configuration. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerSection,
    pub state: StateSection,
    pub lock: LockSection,
    pub categorizer: CategorizerSection,
    pub tracker: TrackerSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StateSection {
    pub data_folder: Option<PathBuf>,
    pub ttl_days: Option<u32>,
    pub max_size_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LockSection {
    pub timeout_ms: Option<u64>,
    pub stale_after_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CategorizerSection {
    pub provider: Option<String>,
    pub gemini_api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TrackerSection {
    pub provider: Option<String>,
    pub zoho_bearer_token: Option<String>,
    pub zoho_team_id: Option<String>,
    pub zoho_project_id: Option<String>,
    pub zoho_sprint_id: Option<String>,
    pub zoho_base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub request_delay_ms: Option<u64>,
    pub local_tasks_file: Option<PathBuf>,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load TOML from `path`; a missing file yields defaults with a warning
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                info!("Loaded configuration from {}", path.display());
                Self::parse(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file {} not found, using environment and defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "Read TOML {} failed: {}",
                path.display(),
                e
            ))),
        }
    }
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Which categorization collaborator to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorizerProvider {
    /// Google Gemini generative model
    Gemini,
    /// Rule-based keyword matcher (no network)
    Keyword,
}

impl FromStr for CategorizerProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "keyword" | "rules" => Ok(Self::Keyword),
            other => Err(Error::Config(format!("Unknown categorizer provider: {}", other))),
        }
    }
}

/// Which task-tracker collaborator to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerProvider {
    /// Zoho Sprints REST API
    Zoho,
    /// JSON file in the data folder
    Local,
}

impl FromStr for TrackerProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zoho" => Ok(Self::Zoho),
            "local" => Ok(Self::Local),
            other => Err(Error::Config(format!("Unknown tracker provider: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSettings {
    pub ttl_days: u32,
    pub max_size_mb: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSettings {
    pub timeout_ms: u64,
    pub stale_after_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizerSettings {
    pub provider: CategorizerProvider,
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

/// Zoho Sprints credentials; all four are required together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZohoCredentials {
    pub bearer_token: String,
    pub team_id: String,
    pub project_id: String,
    pub sprint_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    pub provider: TrackerProvider,
    pub zoho: Option<ZohoCredentials>,
    pub zoho_base_url: String,
    pub timeout_secs: u64,
    pub request_delay_ms: u64,
    pub local_tasks_file: PathBuf,
}

/// Fully resolved engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    pub data_folder: PathBuf,
    pub state: StateSettings,
    pub lock: LockSettings,
    pub categorizer: CategorizerSettings,
    pub tracker: TrackerSettings,
}

impl EngineConfig {
    /// Resolve from the TOML file at `toml_path` (or the platform default) and
    /// the process environment.
    pub fn load(toml_path: Option<&Path>) -> Result<Self> {
        let toml = match toml_path {
            Some(path) => TomlConfig::load_or_default(path)?,
            None => match default_config_path() {
                Some(path) => TomlConfig::load_or_default(&path)?,
                None => TomlConfig::default(),
            },
        };
        Self::from_sources(&toml, |name| std::env::var(name).ok())
    }

    /// Resolve from an already-parsed TOML config and an environment lookup.
    ///
    /// `env` returns the value of a variable, or `None` when unset.
    pub fn from_sources<F>(toml: &TomlConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let host = env("MTA_HOST")
            .or_else(|| toml.server.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = env_parsed(&env, "MTA_PORT")
            .or(toml.server.port)
            .unwrap_or(DEFAULT_PORT);

        let data_folder = env("MTA_DATA_FOLDER")
            .map(PathBuf::from)
            .or_else(|| toml.state.data_folder.clone())
            .unwrap_or_else(default_data_folder);

        let state = StateSettings {
            ttl_days: env_parsed(&env, "MTA_STATE_TTL_DAYS")
                .or(toml.state.ttl_days)
                .unwrap_or(DEFAULT_STATE_TTL_DAYS),
            max_size_mb: env_parsed(&env, "MTA_MAX_STATE_SIZE_MB")
                .or(toml.state.max_size_mb)
                .unwrap_or(DEFAULT_MAX_STATE_SIZE_MB),
        };

        let lock = LockSettings {
            timeout_ms: env_parsed(&env, "MTA_LOCK_TIMEOUT_MS")
                .or(toml.lock.timeout_ms)
                .unwrap_or(DEFAULT_LOCK_TIMEOUT_MS),
            stale_after_ms: env_parsed(&env, "MTA_LOCK_STALE_MS")
                .or(toml.lock.stale_after_ms)
                .unwrap_or(DEFAULT_LOCK_STALE_MS),
            poll_interval_ms: toml.lock.poll_interval_ms.unwrap_or(DEFAULT_LOCK_POLL_MS),
        };

        let gemini_api_key = env("GEMINI_API_KEY").or_else(|| toml.categorizer.gemini_api_key.clone());
        let categorizer_provider = match env("MTA_CATEGORIZER").or_else(|| toml.categorizer.provider.clone()) {
            Some(name) => name.parse()?,
            None if gemini_api_key.is_some() => CategorizerProvider::Gemini,
            None => CategorizerProvider::Keyword,
        };
        let categorizer = CategorizerSettings {
            provider: categorizer_provider,
            gemini_api_key,
            model: env("GEMINI_MODEL")
                .or_else(|| toml.categorizer.model.clone())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            endpoint: toml
                .categorizer
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
            timeout_secs: toml
                .categorizer
                .timeout_secs
                .unwrap_or(DEFAULT_COLLABORATOR_TIMEOUT_SECS),
        };

        let zoho = zoho_credentials(&env, &toml.tracker);
        let tracker_provider = match env("MTA_TRACKER").or_else(|| toml.tracker.provider.clone()) {
            Some(name) => name.parse()?,
            None if zoho.is_some() => TrackerProvider::Zoho,
            None => TrackerProvider::Local,
        };
        let tracker = TrackerSettings {
            provider: tracker_provider,
            zoho,
            zoho_base_url: toml
                .tracker
                .zoho_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_ZOHO_BASE_URL.to_string()),
            timeout_secs: toml
                .tracker
                .timeout_secs
                .unwrap_or(DEFAULT_COLLABORATOR_TIMEOUT_SECS),
            request_delay_ms: toml
                .tracker
                .request_delay_ms
                .unwrap_or(DEFAULT_TRACKER_DELAY_MS),
            local_tasks_file: toml
                .tracker
                .local_tasks_file
                .clone()
                .unwrap_or_else(|| data_folder.join(LOCAL_TASKS_FILE_NAME)),
        };

        let config = Self {
            host,
            port,
            data_folder,
            state,
            lock,
            categorizer,
            tracker,
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides (highest priority)
    pub fn apply_cli(&mut self, host: Option<String>, port: Option<u16>, data_folder: Option<PathBuf>) {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(folder) = data_folder {
            // The local task file follows the data folder unless configured elsewhere
            if self.tracker.local_tasks_file == self.data_folder.join(LOCAL_TASKS_FILE_NAME) {
                self.tracker.local_tasks_file = folder.join(LOCAL_TASKS_FILE_NAME);
            }
            self.data_folder = folder;
        }
    }

    /// Reject combinations the engine cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.state.ttl_days == 0 {
            return Err(Error::Config("state.ttl_days must be at least 1".to_string()));
        }
        if self.lock.timeout_ms == 0 || self.lock.poll_interval_ms == 0 {
            return Err(Error::Config(
                "lock.timeout_ms and lock.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.categorizer.provider == CategorizerProvider::Gemini
            && self.categorizer.gemini_api_key.is_none()
        {
            return Err(Error::Config(
                "Gemini categorizer selected but GEMINI_API_KEY is not configured".to_string(),
            ));
        }
        if self.tracker.provider == TrackerProvider::Zoho && self.tracker.zoho.is_none() {
            return Err(Error::Config(
                "Zoho configuration is incomplete. Set ZOHO_BEARER_TOKEN, ZOHO_TEAM_ID, \
                 ZOHO_PROJECT_ID and ZOHO_SPRINT_ID"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Persisted state document
    pub fn state_file(&self) -> PathBuf {
        self.data_folder.join(STATE_FILE_NAME)
    }

    /// Lock marker guarding the state document
    pub fn lock_file(&self) -> PathBuf {
        self.data_folder.join(LOCK_FILE_NAME)
    }
}

fn env_parsed<T, F>(env: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = env(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value {:?} for {}", raw, name);
            None
        }
    }
}

fn zoho_credentials<F>(env: &F, section: &TrackerSection) -> Option<ZohoCredentials>
where
    F: Fn(&str) -> Option<String>,
{
    let bearer_token = env("ZOHO_BEARER_TOKEN").or_else(|| section.zoho_bearer_token.clone());
    let team_id = env("ZOHO_TEAM_ID").or_else(|| section.zoho_team_id.clone());
    let project_id = env("ZOHO_PROJECT_ID").or_else(|| section.zoho_project_id.clone());
    let sprint_id = env("ZOHO_SPRINT_ID").or_else(|| section.zoho_sprint_id.clone());

    match (bearer_token, team_id, project_id, sprint_id) {
        (Some(bearer_token), Some(team_id), Some(project_id), Some(sprint_id)) => Some(ZohoCredentials {
            bearer_token,
            team_id,
            project_id,
            sprint_id,
        }),
        (None, None, None, None) => None,
        _ => {
            warn!("Zoho credentials are only partially configured; ignoring them");
            None
        }
    }
}

/// Default configuration file: `<config_dir>/mta/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mta").join("config.toml"))
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mta"))
        .unwrap_or_else(|| PathBuf::from("./mta_data"))
}
