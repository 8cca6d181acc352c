//! HTTP plumbing shared by gateway providers
//!
//! - **RetryingHttpClient**: form POST / query GET with a per-attempt timeout
//! - **RetryConfig**: fixed-delay retry of network-layer failures

pub mod http;
pub mod retry;

pub use http::{GatewayResponse, HttpClientConfig, RetryingHttpClient};
pub use retry::RetryConfig;
