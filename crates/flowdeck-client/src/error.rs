//! Internal error types for flowdeck-client.

use thiserror::Error;

/// Result type alias for flowdeck-client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Internal error type for flowdeck-client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Invalid endpoint URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    /// The API answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Response status code.
        status: u16,
        /// Error body message, or the status reason.
        message: String,
    },
    /// The API answered with an `error` field.
    #[error("API error: {0}")]
    Api(String),
    /// Client configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<Error> for flowdeck_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                if e.is_timeout() {
                    flowdeck_core::Error::timeout()
                        .with_message(e.to_string())
                        .with_source(e)
                } else if e.is_connect() {
                    flowdeck_core::Error::network_error()
                        .with_message("Connection failed")
                        .with_source(e)
                } else if e.is_decode() {
                    flowdeck_core::Error::serialization()
                        .with_message(e.to_string())
                        .with_source(e)
                } else {
                    flowdeck_core::Error::network_error()
                        .with_message(e.to_string())
                        .with_source(e)
                }
            }
            Error::Serde(e) => flowdeck_core::Error::serialization()
                .with_message(e.to_string())
                .with_source(e),
            Error::Url(e) => flowdeck_core::Error::invalid_input()
                .with_message(e.to_string())
                .with_source(e),
            Error::Status { status, message } => {
                let error = match status {
                    401 | 403 => flowdeck_core::Error::authentication(),
                    404 => flowdeck_core::Error::not_found(),
                    _ => flowdeck_core::Error::network_error(),
                };
                error.with_message(format!("HTTP {status}: {message}"))
            }
            Error::Api(message) => flowdeck_core::Error::api_error().with_message(message),
            Error::Config(message) => flowdeck_core::Error::invalid_input().with_message(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use flowdeck_core::ErrorKind;

    use super::*;

    #[test]
    fn test_status_classification() {
        let error: flowdeck_core::Error = Error::Status {
            status: 403,
            message: "invalid api key".into(),
        }
        .into();
        assert_eq!(error.kind, ErrorKind::Authentication);

        let error: flowdeck_core::Error = Error::Status {
            status: 404,
            message: "Not Found".into(),
        }
        .into();
        assert_eq!(error.kind, ErrorKind::NotFound);

        let error: flowdeck_core::Error = Error::Status {
            status: 502,
            message: "Bad Gateway".into(),
        }
        .into();
        assert_eq!(error.kind, ErrorKind::NetworkError);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_api_error_keeps_message() {
        let error: flowdeck_core::Error = Error::Api("workflow is running".into()).into();
        assert_eq!(error.kind, ErrorKind::ApiError);
        assert_eq!(error.message.as_deref(), Some("workflow is running"));
    }
}
