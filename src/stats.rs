//! Per type-tag delivery counters.
//!
//! Providers only ever append: a `total` when a send is attempted and a
//! `success` (with latency) when the gateway accepts it.

use std::collections::HashMap;
use std::sync::Mutex;

/// Sink for provider delivery statistics
pub trait StatsCollector: Send + Sync {
    /// Count one attempted send for `type_tag`
    fn add_total(&self, type_tag: &str);

    /// Count `count` accepted sends for `type_tag` that took `elapsed_ms`
    fn add_success(&self, type_tag: &str, count: u64, elapsed_ms: u64);
}

/// Counters for one type tag
#[derive(Debug, Clone, PartialEq)]
pub struct TypeStats {
    pub total: u64,
    pub success: u64,
    /// Number of latency samples recorded
    pub samples: u64,
    pub average_latency_ms: u64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl Default for TypeStats {
    fn default() -> Self {
        Self {
            total: 0,
            success: 0,
            samples: 0,
            average_latency_ms: 0,
            min_latency_ms: u64::MAX,
            max_latency_ms: 0,
        }
    }
}

impl TypeStats {
    fn record_success(&mut self, count: u64, latency_ms: u64) {
        self.success += count;
        self.samples += 1;
        // Running mean over all samples.
        let sum = self.average_latency_ms as u128 * (self.samples - 1) as u128 + latency_ms as u128;
        self.average_latency_ms = (sum / self.samples as u128) as u64;
        self.min_latency_ms = self.min_latency_ms.min(latency_ms);
        self.max_latency_ms = self.max_latency_ms.max(latency_ms);
    }

    /// Success rate as a percentage of attempted sends
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }
}

/// Process-local `StatsCollector`
#[derive(Debug, Default)]
pub struct InMemoryStats {
    buckets: Mutex<HashMap<String, TypeStats>>,
}

impl InMemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the counters for `type_tag`, if anything was recorded
    pub fn snapshot(&self, type_tag: &str) -> Option<TypeStats> {
        self.buckets
            .lock()
            .ok()
            .and_then(|buckets| buckets.get(type_tag).cloned())
    }

    /// All tags with recorded counters, sorted by tag
    pub fn snapshot_all(&self) -> Vec<(String, TypeStats)> {
        let mut all: Vec<_> = match self.buckets.lock() {
            Ok(buckets) => buckets
                .iter()
                .map(|(tag, stats)| (tag.clone(), stats.clone()))
                .collect(),
            Err(_) => Vec::new(),
        };
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

impl StatsCollector for InMemoryStats {
    fn add_total(&self, type_tag: &str) {
        if let Ok(mut buckets) = self.buckets.lock() {
            buckets.entry(type_tag.to_string()).or_default().total += 1;
        }
    }

    fn add_success(&self, type_tag: &str, count: u64, elapsed_ms: u64) {
        if let Ok(mut buckets) = self.buckets.lock() {
            buckets
                .entry(type_tag.to_string())
                .or_default()
                .record_success(count, elapsed_ms);
        }
    }
}
