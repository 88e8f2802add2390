use rescue_core::{EngineConfig, RejectionPolicy, Role, User};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

fn default_submit_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    30
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote authority base URL (e.g., "http://localhost:8080")
    pub server_url: Option<String>,
    /// Sync after every write command when the server is reachable
    #[serde(default)]
    pub auto_sync: bool,
    /// Bound on a single submission
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,
    /// Periodic drain interval for `sync watch` (0 disables the timer)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// What to do with items the server refuses
    #[serde(default)]
    pub on_rejection: RejectionPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            auto_sync: false,
            submit_timeout_secs: default_submit_timeout_secs(),
            interval_secs: default_interval_secs(),
            on_rejection: RejectionPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            submit_timeout: Duration::from_secs(self.submit_timeout_secs.max(1)),
            on_rejection: self.on_rejection,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

/// Who is using this device. Authentication happens elsewhere; the CLI only
/// carries the resulting profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileConfig {
    pub id: ConfigValue<String>,
    pub name: String,
    pub phone: String,
    pub role: ConfigValue<Role>,
}

impl ProfileConfig {
    pub fn user(&self) -> User {
        User::new(self.id.value.clone(), self.role.value)
            .with_name(self.name.clone())
            .with_phone(self.phone.clone())
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Signed-in user
    pub user: ProfileConfig,
    /// Classification endpoint, consulted for new requests while online
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_url: Option<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Sync configuration
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ProfileFile {
    id: Option<String>,
    name: Option<String>,
    phone: Option<String>,
    role: Option<Role>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    user: Option<ProfileFile>,
    classifier_url: Option<String>,
    sync: Option<SyncConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut database_path = ConfigValue::new(
            Self::default_data_dir().join("rescue.db"),
            ConfigSource::Default,
        );
        let mut user = ProfileConfig {
            id: ConfigValue::new("local".to_string(), ConfigSource::Default),
            name: String::new(),
            phone: String::new(),
            role: ConfigValue::new(Role::Citizen, ConfigSource::Default),
        };
        let mut classifier_url = None;
        let mut config_file = None;
        let mut sync = SyncConfig::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(profile) = file_config.user {
                if let Some(id) = profile.id {
                    user.id = ConfigValue::new(id, ConfigSource::File);
                }
                if let Some(role) = profile.role {
                    user.role = ConfigValue::new(role, ConfigSource::File);
                }
                user.name = profile.name.unwrap_or_default();
                user.phone = profile.phone.unwrap_or_default();
            }
            classifier_url = file_config.classifier_url;
            if let Some(sync_config) = file_config.sync {
                sync = sync_config;
            }
        }

        if let Ok(db_path) = std::env::var("RESCUE_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(id) = std::env::var("RESCUE_USER_ID") {
            user.id = ConfigValue::new(id, ConfigSource::Environment);
        }
        if let Ok(raw) = std::env::var("RESCUE_USER_ROLE") {
            let role = raw
                .parse::<Role>()
                .map_err(|e| ConfigError::InvalidValue("RESCUE_USER_ROLE", e))?;
            user.role = ConfigValue::new(role, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("RESCUE_CLASSIFIER_URL") {
            classifier_url = Some(url);
        }
        if let Ok(url) = std::env::var("RESCUE_SYNC_URL") {
            sync.server_url = Some(url);
        }

        Ok(Self {
            database_path,
            user,
            classifier_url,
            config_file,
            sync,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/rescuesync/
    /// - macOS: ~/Library/Application Support/rescuesync/
    /// - Windows: %APPDATA%/rescuesync/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rescuesync")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/rescuesync/
    /// - macOS: ~/Library/Application Support/rescuesync/
    /// - Windows: %APPDATA%/rescuesync/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rescuesync")
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, e) => write!(f, "Invalid {}: {}", name, e),
        }
    }
}

impl std::error::Error for ConfigError {}
