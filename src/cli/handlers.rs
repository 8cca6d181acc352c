//! Command handlers for all CLI operations
//!
//! Translates parsed commands into provider calls and prints the outcome.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::{CliContext, Commands, NotificationArgs};
use xiaomi_push::{
    AndroidContent, AppError, Completion, InMemoryArrivalTracker, InMemoryStats, Notification, PacketInfo,
    PushProvider, SendReport, TokenData, XiaomiProvider,
};

/// Routes commands to the provider, with in-process stats and arrival stores
pub struct CommandHandler {
    context: CliContext,
    stats: Arc<InMemoryStats>,
    arrival: Arc<InMemoryArrivalTracker>,
}

impl CommandHandler {
    pub fn new(context: CliContext) -> Self {
        Self {
            context,
            stats: Arc::new(InMemoryStats::new()),
            arrival: Arc::new(InMemoryArrivalTracker::new()),
        }
    }

    /// Route commands to their appropriate handlers
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Config => self.handle_config(),
            Commands::Send {
                notification,
                tokens,
            } => self.handle_send(notification, tokens).await,
            Commands::Broadcast { notification } => self.handle_broadcast(notification).await,
            Commands::Trace { msg_id } => self.handle_trace(msg_id).await,
            Commands::Init { .. } => {
                anyhow::bail!("init is handled before configuration is loaded")
            }
        }
    }

    fn handle_config(&self) -> Result<()> {
        let rendered = toml::to_string_pretty(&self.context.config().redacted())
            .context("Failed to render configuration")?;
        println!("# {}", self.context.config_path().display());
        print!("{}", rendered);
        Ok(())
    }

    fn provider(&self) -> Result<XiaomiProvider> {
        XiaomiProvider::new(
            &self.context.config().xiaomi,
            self.arrival.clone(),
            self.stats.clone(),
        )
        .context("Failed to create Xiaomi provider")
    }

    async fn handle_send(&self, args: NotificationArgs, tokens: Vec<String>) -> Result<()> {
        let provider = self.provider()?;
        let notification = build_notification(&args);
        let tokens: Vec<TokenData> = tokens.into_iter().map(TokenData::new).collect();

        debug!("Sending {} to {} token(s)", notification.id, tokens.len());
        let report = provider
            .send_many(&notification, &tokens, args.ttl, Some(completion_logger(&notification.id)))
            .await;
        self.print_report(&notification, report);
        Ok(())
    }

    async fn handle_broadcast(&self, args: NotificationArgs) -> Result<()> {
        let provider = self.provider()?;
        let notification = build_notification(&args);

        debug!("Broadcasting {}", notification.id);
        let report = provider
            .send_all(&notification, args.ttl, Some(completion_logger(&notification.id)))
            .await;
        self.print_report(&notification, report);
        Ok(())
    }

    async fn handle_trace(&self, msg_id: String) -> Result<()> {
        let provider = self.provider()?;
        let packet = PacketInfo::new().with(provider.profile().msg_id_key(), msg_id);

        let traced = provider.trace(packet).await;
        let rendered =
            serde_json::to_string_pretty(&traced).context("Failed to render trace result")?;
        println!("{}", rendered);
        Ok(())
    }

    fn print_report(&self, notification: &Notification, report: Option<SendReport>) {
        let Some(report) = report else {
            println!("Skipped {}: no android title", notification.id);
            return;
        };

        match &report.error {
            Some(e) => println!("Failed {}: {}", notification.id, e),
            None if report.accepted => println!("Accepted {}", notification.id),
            None => println!("Rejected {}", notification.id),
        }

        if let Some(info) = self.arrival.get(&notification.id) {
            for (key, value) in &info.provider_meta {
                println!("  {} = {}", key, value);
            }
        }

        for (tag, stats) in self.stats.snapshot_all() {
            println!(
                "  [{}] total={} success={} avg_latency_ms={} success_rate={:.1}%",
                tag,
                stats.total,
                stats.success,
                stats.average_latency_ms,
                stats.success_rate()
            );
        }
    }
}

fn build_notification(args: &NotificationArgs) -> Notification {
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());

    let mut extra = Map::new();
    for (key, value) in &args.extras {
        extra.insert(key.clone(), Value::String(value.clone()));
    }

    Notification::new(
        id,
        AndroidContent {
            title: args.title.clone(),
            message: args.message.clone(),
            extra,
        },
    )
}

fn completion_logger(notification_id: &str) -> Completion {
    let notification_id = notification_id.to_string();
    Box::new(move |err: Option<&AppError>| match err {
        Some(e) => info!("Request for {} finished with error: {}", notification_id, e),
        None => info!("Request for {} finished", notification_id),
    })
}
