//! Reqwest-based HTTP client for the workflow platform API.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::{API_KEY_HEADER, ApiConfig};
use crate::error::{Error, Result};
use crate::request::ApiErrorBody;
use crate::service::DagService;

/// Tracing target for API client operations.
pub const TRACING_TARGET: &str = "flowdeck_client::connect";

/// Inner client that holds the HTTP client and configuration.
struct ApiClientInner {
    http: Client,
    base_url: Url,
    config: ApiConfig,
}

/// HTTP client for the workflow platform's REST API.
///
/// Every request carries the configured API key in the `api-key` header.
/// Cloning is cheap; clones share one connection pool.
///
/// # Examples
///
/// ```rust,ignore
/// use flowdeck_client::{ApiClient, ApiConfig, DagProvider};
///
/// let client = ApiClient::new(ApiConfig::new("localhost:8080", api_key))?;
/// let snapshot = client.get_workflow(workflow_id).await?;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a new API client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;

        let timeout = config.effective_timeout();
        let user_agent = config.effective_user_agent();
        let base_url = config.base_url()?;

        tracing::debug!(
            target: TRACING_TARGET,
            base_url = %base_url,
            timeout_ms = timeout.as_millis(),
            "Creating API client"
        );

        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| Error::Config("API key contains invalid header characters".into()))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(&user_agent)
            .default_headers(headers)
            .build()?;

        let inner = ApiClientInner {
            http,
            base_url,
            config,
        };

        tracing::info!(
            target: TRACING_TARGET,
            "API client created successfully"
        );

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Converts this client into a [`DagService`] for use with dependency injection.
    pub fn into_service(self) -> DagService {
        DagService::new(self)
    }

    /// Resolves an API path against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Sends a GET request and decodes the JSON response.
    pub(crate) async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        tracing::trace!(target: TRACING_TARGET, url = %url, "GET");
        let response = self.inner.http.get(url).send().await?;
        let body = Self::checked_body(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Sends a POST request with a JSON body and decodes the JSON response.
    pub(crate) async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::trace!(target: TRACING_TARGET, url = %url, "POST");
        let response = self.inner.http.post(url).json(body).send().await?;
        let body = Self::checked_body(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Sends a POST request whose response body carries no data.
    pub(crate) async fn post_unit<B>(&self, url: Url, body: Option<&B>) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        tracing::trace!(target: TRACING_TARGET, url = %url, "POST");
        let mut request = self.inner.http.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::checked_body(request.send().await?).await?;
        Ok(())
    }

    /// Reads the body, turning non-2xx statuses and `error` fields into errors.
    async fn checked_body(response: Response) -> Result<Vec<u8>> {
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        check_body(status.as_u16(), status.canonical_reason(), &body)?;
        Ok(body)
    }
}

/// Classifies a response by status and application-level `error` field.
fn check_body(status: u16, reason: Option<&str>, body: &[u8]) -> Result<()> {
    let message = ApiErrorBody::message(body);

    if !(200..300).contains(&status) {
        let message = message
            .or_else(|| reason.map(str::to_owned))
            .unwrap_or_else(|| "request failed".to_owned());
        return Err(Error::Status { status, message });
    }

    match message {
        Some(message) => Err(Error::Api(message)),
        None => Ok(()),
    }
}
