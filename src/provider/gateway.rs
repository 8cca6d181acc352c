use std::collections::BTreeSet;
use url::Url;

use crate::errors::AppResult;

/// Everything that distinguishes one gateway's HTTP API from another's.
///
/// Classification and payload code read from here, so a new gateway with
/// the same API shape is a new profile rather than new logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayProfile {
    type_tag: String,
    base_url: String,
    send_one_path: String,
    send_all_path: String,
    trace_path: String,
    success_codes: BTreeSet<i64>,
}

impl GatewayProfile {
    pub const XIAOMI_BASE_URL: &'static str = "https://api.xmpush.xiaomi.com";

    /// Xiaomi push: 0 is success, 20301 means the message was already accepted.
    pub fn xiaomi() -> Self {
        Self {
            type_tag: "xiaomi".to_string(),
            base_url: Self::XIAOMI_BASE_URL.to_string(),
            send_one_path: "/v3/message/regid".to_string(),
            send_all_path: "/v3/message/all".to_string(),
            trace_path: "/v1/trace/message/status".to_string(),
            success_codes: [0, 20301].into_iter().collect(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_success_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.success_codes = codes.into_iter().collect();
        self
    }

    /// Stats bucket for single-recipient sends
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Stats bucket for broadcast sends
    pub fn all_type_tag(&self) -> String {
        format!("{}All", self.type_tag)
    }

    /// Field that carries this gateway's message id in arrival and packet records
    pub fn msg_id_key(&self) -> String {
        format!("{}_msg_id", self.type_tag)
    }

    pub fn is_success_code(&self, code: i64) -> bool {
        self.success_codes.contains(&code)
    }

    pub fn send_one_url(&self) -> AppResult<Url> {
        self.endpoint(&self.send_one_path)
    }

    pub fn send_all_url(&self) -> AppResult<Url> {
        self.endpoint(&self.send_all_path)
    }

    pub fn trace_url(&self) -> AppResult<Url> {
        self.endpoint(&self.trace_path)
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        let base = Url::parse(&self.base_url)?;
        Ok(base.join(path)?)
    }
}
