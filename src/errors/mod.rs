//! Centralized error handling module
//!
//! Structured, typed errors for configuration, transport and local I/O.
//! The binary wraps these in `anyhow` with command-level context.

pub mod types;

pub use types::{AppError, AppResult};
