use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AtelierConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub hooks: HooksConfig,
    #[serde(default)]
    pub inbox: InboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_pool_min")]
    pub pool_min_connections: u32,

    #[serde(default = "default_pool_max")]
    pub pool_max_connections: u32,

    #[serde(default = "default_acquire_timeout")]
    pub pool_acquire_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub pool_idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// When false, staff may set any status regardless of the transition table.
    #[serde(default = "default_true")]
    pub enforce_transitions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_hook_timeout")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub webhook_url: String,

    /// Append one JSON line per committed mutation to this file when set.
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InboxConfig {
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

fn default_database_url() -> String {
    "postgres://localhost/atelier_dev".to_string()
}

fn default_pool_min() -> u32 {
    1
}

fn default_pool_max() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_hook_timeout() -> u64 {
    5000
}

fn default_preview_chars() -> usize {
    80
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_min_connections: default_pool_min(),
            pool_max_connections: default_pool_max(),
            pool_acquire_timeout_secs: default_acquire_timeout(),
            pool_idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            enforce_transitions: true,
        }
    }
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_hook_timeout(),
            webhook_url: String::new(),
            audit_log_path: None,
        }
    }
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
        }
    }
}

impl AtelierConfig {
    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from_paths(get_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> Result<Self, ConfigLoadError> {
        load_dotenv_files();

        let mut builder = ConfigBuilder::builder();

        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ATELIER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut atelier_config: AtelierConfig = builder.build()?.try_deserialize()?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            atelier_config.database.url = url;
        }

        if let Ok(level) = std::env::var("ATELIER_LOG_LEVEL") {
            atelier_config.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            atelier_config.logging.level = level;
        }

        atelier_config.validate()?;

        Ok(atelier_config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.database.url.is_empty() {
            return Err(ConfigLoadError::MissingRequired("database.url".to_string()));
        }

        if !self.database.url.starts_with("postgres://")
            && !self.database.url.starts_with("postgresql://")
        {
            return Err(ConfigLoadError::InvalidValue {
                key: "database.url".to_string(),
                message:
                    "Must be a valid PostgreSQL URL starting with postgres:// or postgresql://"
                        .to_string(),
            });
        }

        if self.database.pool_min_connections > self.database.pool_max_connections {
            return Err(ConfigLoadError::InvalidValue {
                key: "database.pool_min_connections".to_string(),
                message: "Cannot be greater than pool_max_connections".to_string(),
            });
        }

        if self.hooks.timeout_ms == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "hooks.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if !self.hooks.webhook_url.is_empty()
            && !self.hooks.webhook_url.starts_with("http://")
            && !self.hooks.webhook_url.starts_with("https://")
        {
            return Err(ConfigLoadError::InvalidValue {
                key: "hooks.webhook_url".to_string(),
                message: "Must be an http:// or https:// URL".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level_lower = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level_lower.as_str()) && !level_lower.contains('=') {
            return Err(ConfigLoadError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        Ok(())
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }

    pub fn to_database_config(&self) -> crate::db::DatabaseConfig {
        crate::db::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.pool_max_connections,
            min_connections: self.database.pool_min_connections,
            connect_timeout_secs: self.database.pool_acquire_timeout_secs,
            idle_timeout_secs: self.database.pool_idle_timeout_secs,
        }
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("config").join("default.toml"));
        paths.push(cwd.join("config").join("local.toml"));
        paths.push(cwd.join("atelier.toml"));
    }

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join("config.toml"));
    }

    paths
}

fn load_dotenv_files() {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".env"));
        paths.push(cwd.join(".env.local"));
    }

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join(".env"));
    }

    for path in paths {
        if path.exists() {
            let _ = dotenvy::from_path(&path);
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("atelier"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AtelierConfig::default();

        assert_eq!(config.database.url, "postgres://localhost/atelier_dev");
        assert_eq!(config.database.pool_min_connections, 1);
        assert_eq!(config.database.pool_max_connections, 10);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.workflow.enforce_transitions);
        assert!(config.hooks.enabled);
        assert_eq!(config.hooks.timeout_ms, 5000);
        assert_eq!(config.inbox.preview_chars, 80);
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(AtelierConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_database_url() {
        let mut config = AtelierConfig::default();
        config.database.url = "mysql://localhost/test".to_string();
        assert!(config.validate().is_err());

        config.database.url = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigLoadError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_validation_invalid_pool_config() {
        let mut config = AtelierConfig::default();
        config.database.pool_min_connections = 20;
        config.database.pool_max_connections = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_hooks() {
        let mut config = AtelierConfig::default();
        config.hooks.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AtelierConfig::default();
        config.hooks.webhook_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_log_levels() {
        let mut config = AtelierConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "atelier_core=debug,sqlx=warn".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_database_config() {
        let config = AtelierConfig::default();
        let db = config.to_database_config();
        assert_eq!(db.url, config.database.url);
        assert_eq!(db.max_connections, 10);
        assert_eq!(db.min_connections, 1);
    }
}
