//! Storage for gateway-assigned message ids, keyed by notification id.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::model::ArrivalInfo;

/// Persists the gateway's message id for later delivery tracing
pub trait ArrivalTracker: Send + Sync {
    fn add_arrival_info(
        &self,
        notification_id: &str,
        device_meta: Map<String, Value>,
        provider_meta: Map<String, Value>,
    );
}

/// Process-local `ArrivalTracker`. A later write for the same id replaces
/// the earlier one.
#[derive(Debug, Default)]
pub struct InMemoryArrivalTracker {
    entries: Mutex<HashMap<String, ArrivalInfo>>,
}

impl InMemoryArrivalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, notification_id: &str) -> Option<ArrivalInfo> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(notification_id).cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArrivalTracker for InMemoryArrivalTracker {
    fn add_arrival_info(
        &self,
        notification_id: &str,
        device_meta: Map<String, Value>,
        provider_meta: Map<String, Value>,
    ) {
        let info = ArrivalInfo {
            notification_id: notification_id.to_string(),
            device_meta,
            provider_meta,
            recorded_at: Utc::now(),
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(notification_id.to_string(), info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(id: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("xiaomi_msg_id".to_string(), json!(id));
        map
    }

    #[test]
    fn test_records_by_notification_id() {
        let tracker = InMemoryArrivalTracker::new();
        assert!(tracker.is_empty());

        tracker.add_arrival_info("n1", Map::new(), meta("M1"));
        tracker.add_arrival_info("n2", Map::new(), meta("M2"));

        assert_eq!(tracker.len(), 2);
        let info = tracker.get("n1").unwrap();
        assert_eq!(info.notification_id, "n1");
        assert_eq!(info.provider_meta["xiaomi_msg_id"], "M1");
        assert!(info.device_meta.is_empty());
    }

    #[test]
    fn test_same_id_is_replaced() {
        let tracker = InMemoryArrivalTracker::new();
        tracker.add_arrival_info("n1", Map::new(), meta("M1"));
        tracker.add_arrival_info("n1", Map::new(), meta("M9"));

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get("n1").unwrap().provider_meta["xiaomi_msg_id"], "M9");
    }
}
