//! CLI Context for dependency injection and shared state
//!
//! Loads configuration once and sets up logging for every command that
//! talks to the gateway.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use xiaomi_push::config::ConfigManager;
use xiaomi_push::Config;

/// CLI execution context containing shared configuration
pub struct CliContext {
    pub verbose: bool,
    config_manager: ConfigManager,
}

impl CliContext {
    /// Create a new CLI context, loading the configuration file
    pub fn new(config_path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let config_manager =
            ConfigManager::load(config_path).context("Failed to load configuration")?;
        Ok(Self {
            verbose,
            config_manager,
        })
    }

    pub fn config(&self) -> &Config {
        self.config_manager.config()
    }

    pub fn config_path(&self) -> &Path {
        self.config_manager.path()
    }

    fn env_filter(&self) -> EnvFilter {
        let level = if self.verbose {
            "debug"
        } else {
            self.config().logging.level.as_str()
        };
        EnvFilter::from_default_env()
            .add_directive(level.parse().unwrap_or_else(|_| LevelFilter::INFO.into()))
    }

    /// Initialize logging. Console always; a daily rolling file as well when
    /// `logging.log_path` is set. Keep the returned guard alive to flush it.
    pub fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        let guard = match &self.config().logging.log_path {
            Some(log_path) => {
                let log_path = PathBuf::from(log_path);
                let directory = log_path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                std::fs::create_dir_all(directory).context("Failed to create log directory")?;

                let file_name = log_path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("xiaomi-push.log"));
                let file_appender = tracing_appender::rolling::daily(directory, file_name);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

                let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(self.env_filter())
                    .with(console_layer)
                    .with(file_layer)
                    .try_init()
                    .context("Failed to initialize logging")?;
                Some(guard)
            }
            None => {
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(self.env_filter())
                    .try_init()
                    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
                None
            }
        };

        if self.verbose {
            tracing::debug!("Verbose logging enabled");
            tracing::debug!("Config path: {:?}", self.config_path());
        }

        Ok(guard)
    }
}
