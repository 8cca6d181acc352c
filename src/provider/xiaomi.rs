use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::gateway::GatewayProfile;
use super::{Completion, PushProvider, SendReport};
use crate::arrival::ArrivalTracker;
use crate::clients::{GatewayResponse, HttpClientConfig, RetryingHttpClient};
use crate::config::XiaomiConfig;
use crate::errors::{AppError, AppResult};
use crate::hash::hash_str;
use crate::model::{Notification, PacketInfo, TokenData};
use crate::stats::StatsCollector;

/// Form body for the Xiaomi send endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub notify_id: i32,
    #[serde(rename = "extra.notify_foreground")]
    pub notify_foreground: u8,
    /// JSON envelope `{"android": ..., "id": ...}` handed to the app on tap
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
    pub time_to_live: i64,
}

/// Reply body shared by the send and trace endpoints
#[derive(Debug, Default, Deserialize)]
struct GatewayReply {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
}

impl GatewayReply {
    fn code(&self) -> Option<i64> {
        match self.code.as_ref()? {
            Value::Number(code) => code.as_i64(),
            Value::String(code) => code.trim().parse().ok(),
            _ => None,
        }
    }

    /// `data.id` on a send reply
    fn message_id(&self) -> Option<String> {
        match self.data.as_ref()?.get("id")? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// `data.data` on a trace reply
    fn trace_result(&self) -> Option<&Value> {
        self.data
            .as_ref()?
            .get("data")
            .filter(|result| result.is_object())
    }
}

/// Numbers, or strings holding numbers, as the gateway is loose about both.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Xiaomi push gateway provider
pub struct XiaomiProvider {
    http: RetryingHttpClient,
    profile: GatewayProfile,
    headers: HeaderMap,
    notify_foreground: u8,
    send_one_url: String,
    send_all_url: String,
    trace_url: String,
    arrival: Arc<dyn ArrivalTracker>,
    stats: Arc<dyn StatsCollector>,
}

impl XiaomiProvider {
    /// Build a provider from configuration
    pub fn new(
        config: &XiaomiConfig,
        arrival: Arc<dyn ArrivalTracker>,
        stats: Arc<dyn StatsCollector>,
    ) -> AppResult<Self> {
        let profile = GatewayProfile::xiaomi().with_base_url(config.base_url.clone());
        let http = RetryingHttpClient::new(HttpClientConfig::from(config))?;
        Self::with_profile(config, profile, http, arrival, stats)
    }

    /// Build a provider against an explicit gateway profile and client
    pub fn with_profile(
        config: &XiaomiConfig,
        profile: GatewayProfile,
        http: RetryingHttpClient,
        arrival: Arc<dyn ArrivalTracker>,
        stats: Arc<dyn StatsCollector>,
    ) -> AppResult<Self> {
        if config.app_secret.is_empty() {
            return Err(AppError::validation("xiaomi.app_secret", "must not be empty"));
        }

        let mut headers = HeaderMap::new();
        let auth_value = format!("key={}", config.app_secret);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|_| AppError::validation("xiaomi.app_secret", "not a valid header value"))?,
        );

        Ok(Self {
            send_one_url: profile.send_one_url()?.to_string(),
            send_all_url: profile.send_all_url()?.to_string(),
            trace_url: profile.trace_url()?.to_string(),
            http,
            profile,
            headers,
            notify_foreground: config.foreground_flag(),
            arrival,
            stats,
        })
    }

    pub fn profile(&self) -> &GatewayProfile {
        &self.profile
    }

    /// Build the form body for a send. Pure, no I/O.
    ///
    /// `registration_id` is set only for a non-empty token list. A
    /// non-positive `time_to_live` becomes 0.
    pub fn get_post_data(
        &self,
        notification: &Notification,
        tokens: Option<&[TokenData]>,
        time_to_live: i64,
    ) -> GatewayPayload {
        debug!(
            "getPostData notification {} foreground={}",
            notification.id, self.notify_foreground
        );

        let envelope = json!({
            "android": notification.android,
            "id": notification.id,
        });

        let registration_id = tokens.filter(|t| !t.is_empty()).map(|tokens| {
            tokens
                .iter()
                .map(|t| t.token.as_str())
                .collect::<Vec<_>>()
                .join(",")
        });

        GatewayPayload {
            title: notification.android.title.clone(),
            description: notification.android.message.clone(),
            notify_id: hash_str(&notification.id),
            notify_foreground: self.notify_foreground,
            payload: envelope.to_string(),
            registration_id,
            time_to_live: time_to_live.max(0),
        }
    }

    /// Classify a finished send.
    ///
    /// The completion fires first, with the transport error if there was
    /// one, whatever the classification turns out to be. Returns true only
    /// for HTTP 200 with a whitelisted `code`; in that case a `data.id` in
    /// the reply is recorded as arrival info for `notification_id`.
    pub fn classify(
        &self,
        outcome: &AppResult<GatewayResponse>,
        completion: Option<Completion>,
        notification_id: &str,
    ) -> bool {
        if let Some(done) = completion {
            done(outcome.as_ref().err());
        }

        let response = match outcome {
            Ok(response) if response.status == 200 => response,
            _ => return false,
        };

        let reply: GatewayReply = match serde_json::from_str(&response.body) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Unparseable gateway reply for {}: {}", notification_id, e);
                return false;
            }
        };
        debug!("response result {:?}", reply);

        if !reply.code().is_some_and(|code| self.profile.is_success_code(code)) {
            return false;
        }

        if let Some(msg_id) = reply.message_id() {
            let mut provider_meta = Map::new();
            provider_meta.insert(self.profile.msg_id_key(), Value::String(msg_id));
            self.arrival
                .add_arrival_info(notification_id, Map::new(), provider_meta);
        }
        true
    }

    async fn dispatch(
        &self,
        label: &str,
        type_tag: &str,
        url: &str,
        notification: &Notification,
        form: GatewayPayload,
        completion: Option<Completion>,
    ) -> SendReport {
        self.stats.add_total(type_tag);

        let outcome = self.http.post_form(url, &self.headers, &form).await;
        match &outcome {
            Ok(response) => debug!(
                "{} result {} {} {}",
                label, notification.id, response.status, response.body
            ),
            Err(e) => debug!("{} result {} error: {}", label, notification.id, e),
        }

        let accepted = self.classify(&outcome, completion, &notification.id);
        match &outcome {
            Ok(response) if accepted => {
                self.stats.add_success(type_tag, 1, response.elapsed_ms());
            }
            Ok(response) => error!(
                "{} error {} status={} body={}",
                label, notification.id, response.status, response.body
            ),
            Err(e) => error!(
                "{} error {} [{}]: {}",
                label,
                notification.id,
                e.category(),
                e
            ),
        }

        SendReport {
            error: outcome.err(),
            accepted,
        }
    }

    /// Apply a trace reply body to a packet.
    ///
    /// A parseable reply with a `data.data` object always consumes the
    /// message id, even when the message is not yet resolved.
    fn apply_trace_reply(&self, packet: PacketInfo, body: &str) -> PacketInfo {
        let reply: GatewayReply = match serde_json::from_str(body) {
            Ok(reply) => reply,
            Err(_) => return packet,
        };

        let Some(result) = reply.trace_result() else {
            return packet;
        };

        let packet = packet.without(&self.profile.msg_id_key());
        let resolved = result.get("resolved").and_then(as_number).unwrap_or(0.0);
        if resolved > 0.0 {
            packet.with(self.profile.type_tag(), result.clone())
        } else {
            packet
        }
    }
}

#[async_trait]
impl PushProvider for XiaomiProvider {
    fn type_tag(&self) -> &str {
        self.profile.type_tag()
    }

    async fn send_many(
        &self,
        notification: &Notification,
        tokens: &[TokenData],
        time_to_live: i64,
        completion: Option<Completion>,
    ) -> Option<SendReport> {
        if !notification.android.has_title() {
            debug!("sendOne skipped {}: no android title", notification.id);
            return None;
        }

        let form = self.get_post_data(notification, Some(tokens), time_to_live);
        let type_tag = self.profile.type_tag().to_string();
        let report = self
            .dispatch("sendOne", &type_tag, &self.send_one_url, notification, form, completion)
            .await;
        Some(report)
    }

    async fn send_all(
        &self,
        notification: &Notification,
        time_to_live: i64,
        completion: Option<Completion>,
    ) -> Option<SendReport> {
        if !notification.android.has_title() {
            debug!("sendAll skipped {}: no android title", notification.id);
            return None;
        }

        let form = self.get_post_data(notification, None, time_to_live);
        let type_tag = self.profile.all_type_tag();
        let report = self
            .dispatch("sendAll", &type_tag, &self.send_all_url, notification, form, completion)
            .await;
        info!("sendAll {} accepted={}", notification.id, report.accepted);
        Some(report)
    }

    async fn trace(&self, packet: PacketInfo) -> PacketInfo {
        let key = self.profile.msg_id_key();
        let Some(msg_id) = packet.msg_id(&key).map(str::to_string) else {
            return packet;
        };

        let outcome = self
            .http
            .get_query(&self.trace_url, &self.headers, &[("msg_id", msg_id.as_str())])
            .await;

        match outcome {
            Ok(response) => {
                info!("trace result {} {} {}", msg_id, response.status, response.body);
                self.apply_trace_reply(packet, &response.body)
            }
            Err(e) => {
                info!("trace result {} error: {}", msg_id, e);
                packet
            }
        }
    }
}
