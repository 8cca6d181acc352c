use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::clients::{HttpClientConfig, RetryConfig};
use crate::errors::{AppError, AppResult};
use crate::provider::GatewayProfile;

/// File name looked up in the working directory and the global config dir
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub xiaomi: XiaomiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the Xiaomi push gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XiaomiConfig {
    #[serde(default)]
    pub app_secret: String,
    /// 0 disables foreground display; any other value enables it
    #[serde(default = "default_notify_foreground")]
    pub notify_foreground: i64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
}

fn default_notify_foreground() -> i64 {
    1
}

fn default_base_url() -> String {
    GatewayProfile::XIAOMI_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for XiaomiConfig {
    fn default() -> Self {
        Self {
            app_secret: String::new(),
            notify_foreground: default_notify_foreground(),
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            max_attempts: retry.max_attempts,
            delay_ms: retry.delay_ms,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_path: None,
        }
    }
}

impl XiaomiConfig {
    /// Foreground flag as sent to the gateway
    pub fn foreground_flag(&self) -> u8 {
        if self.notify_foreground == 0 {
            0
        } else {
            1
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig::linear(settings.max_attempts, settings.delay_ms)
    }
}

impl From<&XiaomiConfig> for HttpClientConfig {
    fn from(config: &XiaomiConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            retry_config: RetryConfig::from(&config.retry),
            ..Default::default()
        }
    }
}

impl Config {
    /// Structural checks. The app secret is checked when a provider is built,
    /// so an unconfigured file can still be inspected.
    pub fn validate(&self) -> AppResult<()> {
        if self.xiaomi.retry.max_attempts == 0 {
            return Err(AppError::InvalidConfigValue {
                key: "xiaomi.retry.max_attempts".to_string(),
                value: "0".to_string(),
            });
        }
        if self.xiaomi.timeout_ms == 0 {
            return Err(AppError::InvalidConfigValue {
                key: "xiaomi.timeout_ms".to_string(),
                value: "0".to_string(),
            });
        }
        url::Url::parse(&self.xiaomi.base_url).map_err(|_| AppError::InvalidConfigValue {
            key: "xiaomi.base_url".to_string(),
            value: self.xiaomi.base_url.clone(),
        })?;
        Ok(())
    }

    /// Copy safe for printing
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.xiaomi.app_secret.is_empty() {
            copy.xiaomi.app_secret = "****".to_string();
        }
        copy
    }
}

/// Loads and initializes the configuration file
///
/// # Lookup order
///
/// 1. An explicit path (`--config`)
/// 2. `config.toml` in the working directory
/// 3. `~/.xiaomi-push/config.toml`
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Resolve and load the configuration. A missing file is an error.
    pub fn load(explicit: Option<PathBuf>) -> AppResult<Self> {
        let config_path = Self::resolve_path(explicit)?;
        if !config_path.exists() {
            return Err(AppError::ConfigNotFound { path: config_path });
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| AppError::io_with_source(&config_path, "read config file", e))?;
        let config = Self::parse(&content)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> AppResult<Config> {
        let config: Config = toml::from_str(content)
            .map_err(|e| AppError::config_with_source("Failed to parse config file", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration. Refuses to overwrite unless `force`.
    pub fn init(explicit: Option<PathBuf>, force: bool) -> AppResult<PathBuf> {
        let config_path = match explicit {
            Some(path) => path,
            None => PathBuf::from(CONFIG_FILE_NAME),
        };

        if config_path.exists() && !force {
            return Err(AppError::config(format!(
                "{} already exists, use --force to overwrite",
                config_path.display()
            )));
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io_with_source(parent, "create config directory", e))?;
        }

        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| AppError::config_with_source("Failed to serialize default config", e))?;
        fs::write(&config_path, content)
            .map_err(|e| AppError::io_with_source(&config_path, "write default config", e))?;

        Ok(config_path)
    }

    pub fn resolve_path(explicit: Option<PathBuf>) -> AppResult<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path);
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(local);
        }

        let base_dirs =
            BaseDirs::new().ok_or_else(|| AppError::config("Failed to get base directories"))?;
        Ok(Self::global_path(base_dirs.home_dir()))
    }

    fn global_path(home: &Path) -> PathBuf {
        home.join(".xiaomi-push").join(CONFIG_FILE_NAME)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}
