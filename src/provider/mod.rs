//! Gateway providers
//!
//! Each provider adapts one push gateway's API to the same capability set:
//! targeted send, broadcast send and delivery trace. Routing between
//! providers happens elsewhere.

pub mod gateway;
pub mod xiaomi;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::model::{Notification, PacketInfo, TokenData};

pub use gateway::GatewayProfile;
pub use xiaomi::{GatewayPayload, XiaomiProvider};

/// Fired once, as soon as the gateway request finishes and before the
/// response is classified. Receives the transport error, if any.
pub type Completion = Box<dyn FnOnce(Option<&AppError>) + Send>;

/// Result of one dispatched send.
///
/// `error` and `accepted` are independent: a transport failure leaves
/// `accepted` false with `error` set, while a gateway rejection leaves
/// `accepted` false with no error at all.
#[derive(Debug)]
pub struct SendReport {
    pub error: Option<AppError>,
    pub accepted: bool,
}

/// Push capability implemented once per gateway
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Stats bucket used for targeted sends
    fn type_tag(&self) -> &str;

    /// Send one notification to the given device tokens.
    ///
    /// Returns `None` without touching stats or the network when the
    /// notification has no content for this provider.
    async fn send_many(
        &self,
        notification: &Notification,
        tokens: &[TokenData],
        time_to_live: i64,
        completion: Option<Completion>,
    ) -> Option<SendReport>;

    /// Send one notification to every device registered with the gateway.
    async fn send_all(
        &self,
        notification: &Notification,
        time_to_live: i64,
        completion: Option<Completion>,
    ) -> Option<SendReport>;

    /// Ask the gateway what became of a previously sent message.
    ///
    /// Never fails: anything short of a parseable status reply hands the
    /// packet back unchanged.
    async fn trace(&self, packet: PacketInfo) -> PacketInfo;
}
