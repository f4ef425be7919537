//! Loading state of asynchronously fetched values.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, IntoStaticStr};

/// Where a fetch stands.
///
/// Failures keep the error message so the widget that triggered the fetch
/// can show it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(AsRefStr, IntoStaticStr)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoadingStatus {
    /// Nothing requested yet.
    #[default]
    Initial,
    /// A request is in flight.
    Loading,
    /// The value arrived.
    Succeeded,
    /// The request failed with the given message.
    Failed(String),
}

impl LoadingStatus {
    /// Returns whether a request is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns whether the value arrived.
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns the failure message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// A fetched value together with its loading state.
///
/// The value is only present once the fetch succeeded; starting a new fetch
/// drops the previous value so nothing stale is shown while it is pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Loadable<T> {
    #[serde(flatten)]
    status: LoadingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<T>,
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self::initial()
    }
}

impl<T> Loadable<T> {
    /// Nothing requested yet.
    pub fn initial() -> Self {
        Self {
            status: LoadingStatus::Initial,
            value: None,
        }
    }

    /// A request is in flight.
    pub fn loading() -> Self {
        Self {
            status: LoadingStatus::Loading,
            value: None,
        }
    }

    /// The value arrived.
    pub fn succeeded(value: T) -> Self {
        Self {
            status: LoadingStatus::Succeeded,
            value: Some(value),
        }
    }

    /// The request failed.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: LoadingStatus::Failed(message.into()),
            value: None,
        }
    }

    /// Builds the state from a fetch outcome.
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::succeeded(value),
            Err(error) => Self::failed(error.to_string()),
        }
    }

    /// Returns the loading state.
    pub fn status(&self) -> &LoadingStatus {
        &self.status
    }

    /// Returns the value once the fetch succeeded.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Returns whether a fetch is needed: nothing requested yet, or the
    /// previous attempt failed.
    pub fn needs_fetch(&self) -> bool {
        matches!(self.status, LoadingStatus::Initial | LoadingStatus::Failed(_))
    }
}
