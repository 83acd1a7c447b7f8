//! Fallback Resolver
//!
//! Picks what a caller sees when no fresh value arrived in time. The order is
//! fixed:
//!
//! 1. a stale entry for the key (served from cache, error kept as a warning)
//! 2. the caller's static default (degraded mode, no error)
//! 3. the triggering error
//!
//! Stale real data beats a generic placeholder, and a placeholder beats an
//! error.

use crate::cache::CacheEntry;
use crate::error::FetchError;
use crate::fetch::FetchState;

// == Fallback ==
/// The option chosen by [`FallbackResolver::decide`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback<T> {
    Stale { value: T, warning: FetchError },
    StaticDefault(T),
    Failed(FetchError),
}

impl<T> Fallback<T> {
    pub fn into_state(self) -> FetchState<T> {
        match self {
            Fallback::Stale { value, warning } => FetchState::stale(value, warning.to_string()),
            Fallback::StaticDefault(value) => FetchState::defaulted(value),
            Fallback::Failed(err) => FetchState::failed(err.to_string()),
        }
    }
}

// == Fallback Resolver ==
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResolver;

impl FallbackResolver {
    /// Chooses between stale entry, static default and error.
    pub fn decide<T>(
        stale: Option<CacheEntry<T>>,
        static_default: Option<T>,
        cause: FetchError,
    ) -> Fallback<T> {
        if let Some(entry) = stale {
            return Fallback::Stale {
                value: entry.value,
                warning: cause,
            };
        }

        match static_default {
            Some(value) => Fallback::StaticDefault(value),
            None => Fallback::Failed(cause),
        }
    }
}
