use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use toolcrib_cache::{Clock, FetchError, ProducerError, RequestCache};

/// Clock that only moves when the test advances it.
struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        })
    }

    fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}

#[derive(Debug)]
struct ProducerDown;

impl std::fmt::Display for ProducerDown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "backend unavailable")
    }
}

impl std::error::Error for ProducerDown {}

fn fail() -> Result<u32, ProducerError> {
    Err(Arc::new(ProducerDown))
}

#[tokio::test]
async fn fresh_entry_skips_producer() {
    let clock = ManualClock::new();
    let cache: RequestCache<u32> = RequestCache::with_clock(clock.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let calls = calls.clone();
        let value = cache
            .fetch("tools", Duration::from_secs(1), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_entry_refetches() {
    let clock = ManualClock::new();
    let cache: RequestCache<u32> = RequestCache::with_clock(clock.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let producer = |calls: Arc<AtomicUsize>| {
        move || async move {
            Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
        }
    };

    cache
        .fetch("tools", Duration::from_secs(1), producer(calls.clone()))
        .await
        .unwrap();
    clock.advance(Duration::from_millis(1500));
    cache
        .fetch("tools", Duration::from_secs(1), producer(calls.clone()))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn freshness_window_is_per_call() {
    let clock = ManualClock::new();
    let cache: RequestCache<u32> = RequestCache::with_clock(clock.clone());

    cache.insert("tools", 1);
    clock.advance(Duration::from_secs(10));

    // Stale for a tight window, still fresh for a generous one.
    assert_eq!(cache.get("tools", Duration::from_secs(5)), None);
    assert_eq!(cache.get("tools", Duration::from_secs(60)), Some(1));
}

#[tokio::test]
async fn concurrent_fetches_share_one_producer() {
    let cache: RequestCache<u32> = RequestCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = cache.clone();
        let calls = calls.clone();
        handles.push(tokio::spawn(async move {
            cache
                .fetch("chemicals", Duration::from_secs(60), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok(42)
                })
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 42);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failure_is_shared_and_not_cached() {
    let cache: RequestCache<u32> = RequestCache::new();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache
                .fetch("kits", Duration::from_secs(60), || async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    fail()
                })
                .await
        }));
    }

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, FetchError::Producer(_)));
    }

    // The failure left no entry behind; a retry runs a fresh producer.
    let value = cache
        .fetch("kits", Duration::from_secs(60), || async { Ok(9) })
        .await
        .unwrap();
    assert_eq!(value, 9);
}

#[tokio::test]
async fn invalidate_forces_refetch() {
    let cache: RequestCache<u32> = RequestCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let calls = calls.clone();
        cache
            .fetch("warehouses", Duration::from_secs(60), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
            .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.invalidate("warehouses");

    let calls2 = calls.clone();
    cache
        .fetch("warehouses", Duration::from_secs(60), move || async move {
            calls2.fetch_add(1, Ordering::SeqCst);
            Ok(2)
        })
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidate_all_clears_every_key() {
    let cache: RequestCache<u32> = RequestCache::new();
    cache.insert("a", 1);
    cache.insert("b", 2);

    cache.invalidate_all();

    assert_eq!(cache.get("a", Duration::from_secs(60)), None);
    assert_eq!(cache.get("b", Duration::from_secs(60)), None);
}

#[tokio::test]
async fn insert_primes_the_cache() {
    let cache: RequestCache<u32> = RequestCache::new();
    cache.insert("current-user", 5);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let value = cache
        .fetch("current-user", Duration::from_secs(60), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(99)
        })
        .await
        .unwrap();

    assert_eq!(value, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn evict_older_than_sweeps_stale_entries() {
    let clock = ManualClock::new();
    let cache: RequestCache<u32> = RequestCache::with_clock(clock.clone());

    cache.insert("old", 1);
    clock.advance(Duration::from_secs(30));
    cache.insert("new", 2);

    cache.evict_older_than(Duration::from_secs(10));

    assert_eq!(cache.get("old", Duration::from_secs(3600)), None);
    assert_eq!(cache.get("new", Duration::from_secs(3600)), Some(2));
}

#[tokio::test]
async fn independent_keys_do_not_coalesce() {
    let cache: RequestCache<u32> = RequestCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let a = {
        let cache = cache.clone();
        let calls = calls.clone();
        tokio::spawn(async move {
            cache
                .fetch("a", Duration::from_secs(60), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
        })
    };
    let b = {
        let cache = cache.clone();
        let calls = calls.clone();
        tokio::spawn(async move {
            cache
                .fetch("b", Duration::from_secs(60), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(2)
                })
                .await
        })
    };

    assert_eq!(a.await.unwrap().unwrap(), 1);
    assert_eq!(b.await.unwrap().unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
