use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod error;

pub use error::{producer_error, FetchError, ProducerError};

/// Time source for freshness checks.
///
/// Implement this to control the clock in tests; production code uses
/// [`SystemClock`].
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Default clock backed by `Instant::now()`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, FetchError>>>;

/// A request coalescing cache keyed by caller-chosen strings.
///
/// Three mechanisms share the key namespace:
///
/// - a freshness cache: a value stored at time `t` is reused by any
///   [`fetch`](RequestCache::fetch) whose per-call freshness window still
///   covers it;
/// - in-flight coalescing: while a producer for a key is running, every
///   concurrent `fetch` for that key attaches to the same shared future
///   instead of starting a second producer;
/// - per-key debounce: [`debounce`](RequestCache::debounce) delays the
///   producer and lets rapid successive calls supersede one another, so
///   only the latest call's producer ever runs.
///
/// Cloning the cache yields a handle to the same underlying maps.
pub struct RequestCache<V> {
    entries: Arc<DashMap<String, (V, Instant)>>,
    pending: Arc<DashMap<String, SharedFetch<V>>>,
    debounce_generation: Arc<DashMap<String, u64>>,
    clock: Arc<dyn Clock>,
}

impl<V> Clone for RequestCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            pending: self.pending.clone(),
            debounce_generation: self.debounce_generation.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> RequestCache<V> {
    /// Create a cache using the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create a cache with an injected time source.
    pub fn with_clock(clock: impl Clock) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            pending: Arc::new(DashMap::new()),
            debounce_generation: Arc::new(DashMap::new()),
            clock: Arc::new(clock),
        }
    }

    /// Fetch the value for `key`, invoking `producer` at most once per
    /// freshness window.
    ///
    /// Resolution order:
    ///
    /// 1. A cached value younger than `freshness` is returned as-is.
    /// 2. An in-flight producer for the same key is awaited; the producer
    ///    is not invoked again.
    /// 3. Otherwise the producer runs. On success the value is cached with
    ///    the current timestamp; on failure nothing is cached and the error
    ///    is handed to every attached caller, so an immediate retry with
    ///    the same key starts a fresh producer.
    ///
    /// The freshness window is per call: two callers may pass different
    /// windows for the same key and observe different hit/miss outcomes.
    pub async fn fetch<F, Fut>(
        &self,
        key: &str,
        freshness: Duration,
        producer: F,
    ) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ProducerError>> + Send + 'static,
    {
        if let Some(value) = self.get(key, freshness) {
            return Ok(value);
        }

        // The entry API makes check-or-register atomic: exactly one caller
        // becomes the leader for this key, everyone else attaches.
        let shared = match self.pending.entry(key.to_string()) {
            Entry::Occupied(occupied) => occupied.get().clone(),
            Entry::Vacant(vacant) => {
                let fut = producer();
                let entries = self.entries.clone();
                let pending = self.pending.clone();
                let clock = self.clock.clone();
                let owned_key = key.to_string();
                let wrapped: BoxFuture<'static, Result<V, FetchError>> = Box::pin(async move {
                    let result = fut.await.map_err(FetchError::Producer);
                    if let Ok(value) = &result {
                        entries.insert(owned_key.clone(), (value.clone(), clock.now()));
                    }
                    pending.remove(&owned_key);
                    result
                });
                let shared = wrapped.shared();
                vacant.insert(shared.clone());
                shared
            }
        };

        shared.await
    }

    /// Delay `producer` by `delay`, letting any later `debounce` call for
    /// the same key supersede this one.
    ///
    /// Superseded calls return [`FetchError::Superseded`] and their
    /// producer is never started. Only the most recent call's producer
    /// executes once its quiet period elapses. Results are not written to
    /// the freshness cache.
    pub async fn debounce<F, Fut>(
        &self,
        key: &str,
        delay: Duration,
        producer: F,
    ) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ProducerError>>,
    {
        let my_generation = {
            let mut slot = self.debounce_generation.entry(key.to_string()).or_insert(0);
            *slot += 1;
            *slot
        };

        tokio::time::sleep(delay).await;

        let still_current = self
            .debounce_generation
            .get(key)
            .is_some_and(|current| *current == my_generation);
        if !still_current {
            return Err(FetchError::Superseded);
        }

        let result = producer().await.map_err(FetchError::Producer);
        self.debounce_generation
            .remove_if(key, |_, current| *current == my_generation);
        result
    }

    /// Return the cached value for `key` if one exists and is younger than
    /// `freshness`. Stale entries are left in place; they are overwritten
    /// by the next successful fetch or removed by explicit invalidation.
    pub fn get(&self, key: &str, freshness: Duration) -> Option<V> {
        let entry = self.entries.get(key)?;
        let (value, stored_at) = entry.value();
        if self.clock.now().duration_since(*stored_at) < freshness {
            return Some(value.clone());
        }
        None
    }

    /// Store a value for `key` as of now, without running a producer.
    ///
    /// Used to prime the cache when the value was obtained out of band
    /// (e.g. an explicit login already returned the current user).
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), (value, self.clock.now()));
    }

    /// Drop the cached entry for `key`, forcing the next fetch to run its
    /// producer. In-flight producers are unaffected.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Remove every entry older than `max_age`. Optional housekeeping;
    /// nothing calls this automatically.
    pub fn evict_older_than(&self, max_age: Duration) {
        let now = self.clock.now();
        self.entries
            .retain(|_, (_, stored_at)| now.duration_since(*stored_at) < max_age);
    }
}

impl<V: Clone + Send + Sync + 'static> Default for RequestCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
