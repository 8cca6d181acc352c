//! CLI module providing command-line interface functionality
//!
//! Argument parsing, context setup and routing to handlers.

pub mod commands;
pub mod context;
pub mod handlers;

use anyhow::Result;
use clap::Parser;
use xiaomi_push::ConfigManager;

pub use commands::{Cli, Commands, NotificationArgs};
pub use context::CliContext;
pub use handlers::CommandHandler;

/// Main CLI application
pub struct CliApp;

impl CliApp {
    /// Parse command line arguments and execute the requested command
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();

        // `init` must work before any configuration exists.
        if let Commands::Init { force } = cli.command {
            let path = ConfigManager::init(cli.config, force)?;
            println!("Wrote default configuration to {}", path.display());
            return Ok(());
        }

        let context = CliContext::new(cli.config, cli.verbose)?;
        let _log_guard = context.init_logging()?;

        let handler = CommandHandler::new(context);
        handler.handle_command(cli.command).await
    }
}
