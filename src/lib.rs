//! Xiaomi Push Dispatch Library
//!
//! Sends Android push notifications through the Xiaomi push gateway,
//! classifies gateway replies, records the gateway's message ids and traces
//! their delivery status later.

pub mod arrival;
pub mod clients;
pub mod config;
pub mod errors;
pub mod hash;
pub mod model;
pub mod provider;
pub mod stats;

// Re-export commonly used types for convenience
pub use arrival::{ArrivalTracker, InMemoryArrivalTracker};
pub use config::{Config, ConfigManager, XiaomiConfig};
pub use errors::{AppError, AppResult};
pub use model::{AndroidContent, ArrivalInfo, Notification, PacketInfo, TokenData};
pub use provider::{Completion, GatewayProfile, PushProvider, SendReport, XiaomiProvider};
pub use stats::{InMemoryStats, StatsCollector};
