//! TTL Cleanup Task
//!
//! Background task that periodically purges entries that have been stale for
//! longer than the retention window. Entries inside the window stay available
//! as stale fallbacks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::fetch::Orchestrator;

/// Spawns a background task that periodically purges long-stale entries.
///
/// The task runs in an infinite loop, sleeping for `interval` between runs.
///
/// # Arguments
/// * `store` - shared reference to the cache store
/// * `interval` - time between cleanup runs
/// * `retention` - how long past its TTL an entry is kept
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let store: Arc<dyn CacheStore<User>> = Arc::new(EphemeralStore::new());
/// let cleanup_handle = spawn_cleanup_task(store.clone(), Duration::from_secs(60), Duration::from_secs(3600));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<T: 'static>(
    store: Arc<dyn CacheStore<T>>,
    interval: Duration,
    retention: Duration,
) -> JoinHandle<()> {
    spawn_purge_loop(move |retention| store.purge_expired(retention), interval, retention)
}

/// Spawns the cleanup loop for both stores of an orchestrator, timed by the
/// `CLEANUP_INTERVAL` and `STALE_RETENTION_SECS` settings.
///
/// # Example
/// ```ignore
/// let config = Config::from_env();
/// let orchestrator = Orchestrator::<User>::from_config(&config)?;
/// let cleanup_handle = spawn_orchestrator_cleanup(&orchestrator, &config);
/// ```
pub fn spawn_orchestrator_cleanup<T>(orchestrator: &Orchestrator<T>, config: &Config) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    let orchestrator = orchestrator.clone();
    spawn_purge_loop(
        move |retention| orchestrator.purge_expired(retention),
        config.cleanup_interval(),
        config.stale_retention(),
    )
}

fn spawn_purge_loop<P>(purge: P, interval: Duration, retention: Duration) -> JoinHandle<()>
where
    P: Fn(Duration) -> usize + Send + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {}ms, retention {}s",
            interval.as_millis(),
            retention.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = purge(retention);

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
