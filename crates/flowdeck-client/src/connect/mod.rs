//! HTTP connection to the workflow platform.

mod client;
mod config;
mod endpoints;

pub use client::{ApiClient, TRACING_TARGET};
pub use config::{API_KEY_HEADER, ApiConfig, DEFAULT_TIMEOUT_SECS};
