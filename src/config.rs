use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const BACKEND_PORT_ENV: &str = "BACKEND_PORT";
pub const FRONTEND_PORT_ENV: &str = "FRONTEND_PORT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Read access to environment variables.
///
/// Everything that consults the process environment goes through this trait
/// so tests can supply a fixed map instead of mutating global state.
pub trait Environment: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment. Empty values count as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of user data. The selection document lives below it.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Knowledge base root. Defaults to `{data_dir}/knowledge_bases`.
    #[serde(default)]
    pub kb_base_dir: Option<PathBuf>,

    #[serde(default = "default_pipeline")]
    pub default_pipeline: String,

    #[serde(default = "default_backend_port")]
    pub backend_port: u16,

    #[serde(default = "default_frontend_port")]
    pub frontend_port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub realtimex: RealtimeXConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            kb_base_dir: None,
            default_pipeline: default_pipeline(),
            backend_port: default_backend_port(),
            frontend_port: default_frontend_port(),
            logging: LoggingConfig::default(),
            realtimex: RealtimeXConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Service tag prepended to forwarded log lines, e.g. `Backend`.
    #[serde(default)]
    pub service_prefix: Option<String>,

    #[serde(default = "default_true")]
    pub include_module: bool,

    /// Capacity of the forwarding channel. Entries beyond it are dropped.
    #[serde(default = "default_forward_capacity")]
    pub forward_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            service_prefix: None,
            include_module: default_true(),
            forward_capacity: default_forward_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeXConfig {
    /// Environment variable whose presence gates detection.
    #[serde(default = "default_app_id_env")]
    pub app_id_env: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_health_timeout", with = "duration_ms")]
    pub health_timeout: Duration,

    #[serde(default = "default_providers_ttl", with = "duration_ms")]
    pub providers_ttl: Duration,
}

impl Default for RealtimeXConfig {
    fn default() -> Self {
        Self {
            app_id_env: default_app_id_env(),
            base_url: default_base_url(),
            health_timeout: default_health_timeout(),
            providers_ttl: default_providers_ttl(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file, then apply environment overrides. A missing
    /// file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(path: &Path, env: &dyn Environment) -> ConfigResult<Self> {
        let mut config = if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            serde_json::from_reader(reader)?
        } else {
            Self::default()
        };
        config.apply_env(env)?;
        Ok(config)
    }

    /// Apply `LOG_LEVEL`, `BACKEND_PORT` and `FRONTEND_PORT` overrides.
    pub fn apply_env(&mut self, env: &dyn Environment) -> ConfigResult<()> {
        if let Some(level) = env.var(LOG_LEVEL_ENV) {
            self.logging.level = level;
        }
        if let Some(port) = env.var(BACKEND_PORT_ENV) {
            self.backend_port = parse_port(BACKEND_PORT_ENV, &port)?;
        }
        if let Some(port) = env.var(FRONTEND_PORT_ENV) {
            self.frontend_port = parse_port(FRONTEND_PORT_ENV, &port)?;
        }
        Ok(())
    }

    pub fn kb_base_dir(&self) -> PathBuf {
        self.kb_base_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("knowledge_bases"))
    }

    pub fn selection_path(&self) -> PathBuf {
        self.data_dir
            .join("user")
            .join("settings")
            .join("rtx_active.json")
    }
}

fn parse_port(key: &str, value: &str) -> ConfigResult<u16> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_pipeline() -> String {
    "realtimex".to_string()
}
fn default_backend_port() -> u16 {
    8001
}
fn default_frontend_port() -> u16 {
    3782
}
fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_true() -> bool {
    true
}
fn default_forward_capacity() -> usize {
    1000
}
fn default_app_id_env() -> String {
    "RTX_APP_ID".to_string()
}
fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}
fn default_health_timeout() -> Duration {
    Duration::from_secs(2)
}
fn default_providers_ttl() -> Duration {
    Duration::from_secs(60)
}

pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
