//! Command definitions and structures for the CLI
//!
//! All clap-based argument definitions: the top-level CLI and subcommands.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "xiaomi-push")]
#[command(about = "Dispatch and trace Android push notifications through the Xiaomi gateway")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./config.toml, then ~/.xiaomi-push/config.toml)
    #[arg(short, long, global = true, env = "XIAOMI_PUSH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration with secrets masked
    Config,

    /// Send a notification to specific device tokens
    Send {
        #[command(flatten)]
        notification: NotificationArgs,

        /// Device registration token (repeatable)
        #[arg(short = 'k', long = "token", required = true)]
        tokens: Vec<String>,
    },

    /// Send a notification to every registered device
    Broadcast {
        #[command(flatten)]
        notification: NotificationArgs,
    },

    /// Query the delivery status of a gateway message id
    Trace {
        /// Message id returned by the gateway on send
        #[arg(short, long)]
        msg_id: String,
    },
}

/// Notification content shared by send and broadcast
#[derive(Args, Debug, Clone)]
pub struct NotificationArgs {
    /// Notification id (defaults to the current time in milliseconds)
    #[arg(long)]
    pub id: Option<String>,

    /// Android title; without one nothing is sent
    #[arg(short, long)]
    pub title: Option<String>,

    /// Android message body
    #[arg(short, long)]
    pub message: Option<String>,

    /// Time to live; non-positive values mean the gateway default
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub ttl: i64,

    /// Extra android field as key=value (repeatable)
    #[arg(short, long = "extra", value_parser = parse_key_val)]
    pub extras: Vec<(String, String)>,
}

/// Parse a `key=value` pair
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid key=value: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
