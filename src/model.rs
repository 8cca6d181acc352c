//! Notification and delivery-tracking records shared by every provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A notification as handed to a provider. Immutable once dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub android: AndroidContent,
}

/// Android-specific content of a notification.
///
/// A missing `title` means this notification carries nothing for Android
/// gateways and is silently skipped by them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AndroidContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Any further fields travel untouched inside the payload envelope.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notification {
    pub fn new(id: impl Into<String>, android: AndroidContent) -> Self {
        Self {
            id: id.into(),
            android,
        }
    }
}

impl AndroidContent {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            message: Some(message.into()),
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// True when a title is present and non-empty.
    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// One device registration identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenData {
    pub token: String,
}

impl TokenData {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

/// Links a local notification id to the id the gateway assigned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalInfo {
    pub notification_id: String,
    pub device_meta: Map<String, Value>,
    pub provider_meta: Map<String, Value>,
    pub recorded_at: DateTime<Utc>,
}

/// A loosely-typed delivery record handed to `trace`.
///
/// Providers look for their own `<type>_msg_id` field and, once the gateway
/// reports on it, replace that field with a `<type>` result object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PacketInfo(Map<String, Value>);

impl PacketInfo {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Non-empty string stored under `key`, if any.
    pub fn msg_id(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.0.remove(key);
        self
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}
