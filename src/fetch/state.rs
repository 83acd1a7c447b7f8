//! Fetch State
//!
//! The `{data, loading, error}` snapshot handed to consumers.

use serde::Serialize;

// == Fetch State ==
/// Snapshot of one cached fetch.
///
/// `error` is only set when no fresh, stale or static data could be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub served_from_cache: bool,
    /// Non-fatal error attached to stale data
    pub warning: Option<String>,
}

impl<T> FetchState<T> {
    /// Loading state showing the stored entry while the producer runs.
    pub fn loading(placeholder: Option<T>) -> Self {
        Self {
            served_from_cache: placeholder.is_some(),
            data: placeholder,
            is_loading: true,
            error: None,
            warning: None,
        }
    }

    /// Loading state that keeps data from an earlier settled state visible.
    ///
    /// That data may be a static default, so it is not marked as cached.
    pub fn reloading(previous: Option<T>) -> Self {
        Self {
            data: previous,
            is_loading: true,
            error: None,
            served_from_cache: false,
            warning: None,
        }
    }

    /// A fresh entry answered the request.
    pub fn cached(value: T) -> Self {
        Self {
            data: Some(value),
            is_loading: false,
            error: None,
            served_from_cache: true,
            warning: None,
        }
    }

    /// The producer answered the request.
    pub fn fetched(value: T) -> Self {
        Self {
            data: Some(value),
            is_loading: false,
            error: None,
            served_from_cache: false,
            warning: None,
        }
    }

    /// A stale entry stood in for a failed or slow producer.
    pub fn stale(value: T, warning: impl Into<String>) -> Self {
        Self {
            data: Some(value),
            is_loading: false,
            error: None,
            served_from_cache: true,
            warning: Some(warning.into()),
        }
    }

    /// The static default stood in; degraded mode is not an error.
    pub fn defaulted(value: T) -> Self {
        Self::fetched(value)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: None,
            is_loading: false,
            error: Some(message.into()),
            served_from_cache: false,
            warning: None,
        }
    }

    /// True once the fetch settled with usable data.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}
