//! Fetch Module
//!
//! The cached-fetch orchestrator, its fallback policy and the handles callers
//! use to consume it.

pub mod config;
mod fallback;
mod handle;
mod keyed;
mod orchestrator;
mod state;

pub use config::{FetchConfig, FetchConfigBuilder, DEFAULT_TTL};
pub use fallback::{Fallback, FallbackResolver};
pub use handle::CachedFetch;
pub use keyed::{CacheConfig, KeyedCache};
pub use orchestrator::Orchestrator;
pub use state::FetchState;
