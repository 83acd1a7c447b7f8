//! Subscribable fetch handle
//!
//! [`CachedFetch`] drives one keyed fetch through the orchestrator and
//! publishes every [`FetchState`] transition on a `watch` channel, so UI code
//! can render `{data, is_loading, error}` as it changes.
//!
//! Dropping the handle stops notifications. It does not abort the producer,
//! which other coalesced waiters may still depend on.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::fetch::orchestrator::Resolution;
use crate::fetch::{FetchConfig, FetchState, Orchestrator};

type ProducerFn<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

// == Cached Fetch ==
/// A live, refetchable view of one cached fetch.
pub struct CachedFetch<T> {
    orchestrator: Orchestrator<T>,
    config: Arc<FetchConfig<T>>,
    producer: ProducerFn<T>,
    state_tx: Arc<watch::Sender<FetchState<T>>>,
    state_rx: watch::Receiver<FetchState<T>>,
    driver: Option<JoinHandle<()>>,
    deps: Option<u64>,
}

impl<T> CachedFetch<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Spawn ==
    /// Starts the fetch. A fresh entry settles the state immediately; otherwise
    /// the state is loading (with any stale value as placeholder) until the
    /// orchestrator resolves.
    pub fn spawn<F, Fut, E>(orchestrator: Orchestrator<T>, config: FetchConfig<T>, producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let producer: ProducerFn<T> = Arc::new(move || {
            let fut = producer();
            async move {
                let result: anyhow::Result<T> = fut.await.map_err(Into::into);
                result
            }
            .boxed()
        });

        let (state_tx, state_rx) = watch::channel(FetchState::loading(None));
        let mut fetch = Self {
            orchestrator,
            config: Arc::new(config),
            producer,
            state_tx: Arc::new(state_tx),
            state_rx,
            driver: None,
            deps: None,
        };
        fetch.start(false);
        fetch
    }

    // == State ==
    /// Returns the latest published state.
    pub fn state(&self) -> FetchState<T> {
        self.state_rx.borrow().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.state_rx.borrow().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state_rx.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state_rx.borrow().error.clone()
    }

    /// True when the store holds an entry for the key, fresh or stale.
    pub fn has_cache(&self) -> bool {
        self.orchestrator.cached(&self.config).is_some()
    }

    /// Returns an independent receiver of state transitions.
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state_tx.subscribe()
    }

    /// Waits for the next state transition.
    pub async fn changed(&mut self) -> FetchState<T> {
        // The handle owns a sender, so the channel cannot close under us
        let _ = self.state_rx.changed().await;
        self.state_rx.borrow_and_update().clone()
    }

    /// Waits until the fetch is no longer loading and returns that state.
    pub async fn settled(&mut self) -> FetchState<T> {
        loop {
            {
                let state = self.state_rx.borrow_and_update();
                if !state.is_loading {
                    return state.clone();
                }
            }
            if self.state_rx.changed().await.is_err() {
                return self.state_rx.borrow().clone();
            }
        }
    }

    // == Refetch ==
    /// Restarts the fetch. Notifications from a previous run stop; its
    /// producer keeps running.
    pub fn refetch(&mut self, force_refresh: bool) {
        self.start(force_refresh);
    }

    // == Dependencies ==
    /// Records the dependency value, refetching when it differs from the last
    /// one seen. Returns whether a refetch started.
    pub fn set_deps<D: Hash>(&mut self, deps: &D) -> bool {
        let mut hasher = DefaultHasher::new();
        deps.hash(&mut hasher);
        let digest = hasher.finish();

        match self.deps.replace(digest) {
            Some(previous) if previous != digest => {
                debug!(key = self.config.key(), "dependencies changed, refetching");
                self.start(false);
                true
            }
            _ => false,
        }
    }

    fn start(&mut self, force_refresh: bool) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }

        // The flight starts here, outside the abortable driver
        let producer = Arc::clone(&self.producer);
        let pending = match self.orchestrator.begin(&self.config, move || producer(), force_refresh) {
            Resolution::Ready(state) => {
                self.state_tx.send_replace(state);
                return;
            }
            Resolution::Pending(pending) => pending,
        };

        let loading = match pending.stale_value() {
            Some(value) => FetchState::loading(Some(value.clone())),
            None => FetchState::reloading(self.state_rx.borrow().data.clone()),
        };
        self.state_tx.send_replace(loading);

        let orchestrator = self.orchestrator.clone();
        let config = Arc::clone(&self.config);
        let state_tx = Arc::clone(&self.state_tx);

        self.driver = Some(tokio::spawn(async move {
            let state = orchestrator.settle(&config, pending).await;
            state_tx.send_replace(state);
        }));
    }
}

impl<T> Drop for CachedFetch<T> {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}
