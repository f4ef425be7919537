//! API client configuration.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "api-key";

/// Connection settings for the workflow platform API.
///
/// Passed explicitly to [`ApiClient::new`](super::ApiClient::new); nothing
/// reads it from process-wide state.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ApiConfig {
    /// API server address as `host[:port]`
    #[cfg_attr(
        feature = "config",
        arg(long = "api-address", env = "FLOWDECK_API_ADDRESS", default_value = "localhost:8080")
    )]
    pub api_address: String,

    /// Use HTTPS instead of HTTP
    #[cfg_attr(feature = "config", arg(long = "api-https", env = "FLOWDECK_API_HTTPS"))]
    #[serde(default)]
    pub use_https: bool,

    /// API key sent in the `api-key` header
    #[cfg_attr(
        feature = "config",
        arg(long = "api-key", env = "FLOWDECK_API_KEY", hide_env_values = true)
    )]
    pub api_key: String,

    /// HTTP request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-timeout", env = "FLOWDECK_HTTP_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "FLOWDECK_HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_address", &self.api_address)
            .field("use_https", &self.use_https)
            .field("api_key", &"<redacted>")
            .field("http_timeout", &self.http_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ApiConfig {
    /// Creates a plain-HTTP configuration for `address` with default timeouts.
    pub fn new(address: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_address: address.into(),
            use_https: false,
            api_key: api_key.into(),
            http_timeout: default_timeout_secs(),
            user_agent: None,
        }
    }

    /// Switches to HTTPS.
    #[must_use]
    pub fn with_https(mut self, use_https: bool) -> Self {
        self.use_https = use_https;
        self
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.http_timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.http_timeout)
        }
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(Self::default_user_agent)
    }

    fn default_user_agent() -> String {
        format!("flowdeck/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Returns the base URL all endpoints are resolved against.
    ///
    /// A scheme already present in the address wins over `use_https`.
    pub fn base_url(&self) -> Result<Url> {
        let address = self.api_address.trim().trim_end_matches('/');
        let url = if address.contains("://") {
            format!("{address}/")
        } else {
            let scheme = if self.use_https { "https" } else { "http" };
            format!("{scheme}://{address}/")
        };
        Ok(Url::parse(&url)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.api_address.trim().is_empty() {
            return Err(Error::Config("API address must not be empty".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("API key must not be empty".into()));
        }
        self.base_url()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_scheme() {
        let config = ApiConfig::new("localhost:8080", "key");
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:8080/");

        let config = config.with_https(true);
        assert_eq!(config.base_url().unwrap().as_str(), "https://localhost:8080/");

        let config = ApiConfig::new("https://api.example.com/", "key");
        assert_eq!(config.base_url().unwrap().as_str(), "https://api.example.com/");
    }

    #[test]
    fn test_effective_timeout_uses_default_when_zero() {
        let config = ApiConfig::new("localhost", "key").with_timeout(0);
        assert_eq!(
            config.effective_timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_effective_user_agent_uses_default_when_none() {
        let config = ApiConfig::new("localhost", "key");
        assert!(config.effective_user_agent().starts_with("flowdeck/"));
    }

    #[test]
    fn test_validate_rejects_missing_key() {
        assert!(ApiConfig::new("localhost", " ").validate().is_err());
        assert!(ApiConfig::new("", "key").validate().is_err());
        assert!(ApiConfig::new("localhost:8080", "key").validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ApiConfig::new("localhost", "super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
