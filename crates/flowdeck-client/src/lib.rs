#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod connect;
mod error;
mod provider;
mod request;
mod service;

#[cfg(feature = "mock")]
#[cfg_attr(docsrs, doc(cfg(feature = "mock")))]
pub mod mock;

pub use connect::{API_KEY_HEADER, ApiClient, ApiConfig, DEFAULT_TIMEOUT_SECS};
pub use error::{Error, Result};
pub use provider::DagProvider;
pub use request::PositioningRequest;
pub use service::DagService;

/// Tracing target for client operations.
pub const TRACING_TARGET: &str = "flowdeck_client";
