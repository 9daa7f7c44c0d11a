use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use tokio::time::timeout;

use crate::{
    cache::Cache,
    dverr,
    reader::{DecodeImage, FetchBytes},
    types::{LoaderStats, ResultSharedImage},
    SharedImage,
};

type SharedLoad = Shared<BoxFuture<'static, ResultSharedImage>>;
type DynFetchBytes = dyn FetchBytes + Send + Sync;
type DynDecodeImage = dyn DecodeImage + Send + Sync;

struct LoaderState {
    cache: Box<dyn Cache + Send>,
    in_flight: HashMap<String, SharedLoad>,
    stats: LoaderStats,
}

fn lock(state: &Mutex<LoaderState>) -> MutexGuard<'_, LoaderState> {
    // the state stays consistent even if a holder panicked, every critical section is a
    // single map operation
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Removes the url from the in-flight map if the loading task ends without finishing, i.e., it
/// panicked or was cancelled. Otherwise later requests would join the dead task forever.
struct InFlightGuard {
    state: Arc<Mutex<LoaderState>>,
    url: Option<String>,
}
impl InFlightGuard {
    fn disarm(&mut self) {
        self.url = None;
    }
}
impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(url) = self.url.take() {
            tracing::warn!("loading {url} did not finish");
            lock(&self.state).in_flight.remove(&url);
        }
    }
}

async fn fetch_and_decode(
    fetcher: Arc<DynFetchBytes>,
    decoder: Arc<DynDecodeImage>,
    url: &str,
    load_timeout: Duration,
) -> ResultSharedImage {
    let bytes = timeout(load_timeout, fetcher.fetch_bytes(url))
        .await
        .map_err(|_| {
            dverr!(
                Load,
                "timeout while loading {url}, waited more than {load_timeout:?}"
            )
        })??;
    let im = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
        .await
        .map_err(|e| dverr!(Load, "decoding task for {url} failed due to {e:?}"))?
        .map_err(|e| dverr!(Load, "cannot decode image from {url}, {}", e.msg()))?;
    Ok(Arc::new(im))
}

/// Resolves urls to decoded images. Results are memoized in the cache and concurrent requests
/// for the same url share one download.
///
/// Each download runs in its own task on the tokio runtime, such that it finishes and fills the
/// cache even if all callers waiting for it went away. Decoding happens on the blocking pool.
/// Failed loads are not cached, the next request for the url tries again.
pub struct Loader {
    state: Arc<Mutex<LoaderState>>,
    fetcher: Arc<DynFetchBytes>,
    decoder: Arc<DynDecodeImage>,
    load_timeout: Duration,
}

impl Loader {
    pub fn new(
        cache: Box<dyn Cache + Send>,
        fetcher: Arc<DynFetchBytes>,
        decoder: Arc<DynDecodeImage>,
        load_timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(LoaderState {
                cache,
                in_flight: HashMap::new(),
                stats: LoaderStats::default(),
            })),
            fetcher,
            decoder,
            load_timeout,
        }
    }

    /// Returns the image if it is in the cache. Never touches the network, does not count as a
    /// hit and leaves the eviction order alone.
    pub fn get_cached(&self, url: &str) -> Option<SharedImage> {
        lock(&self.state).cache.peek(url)
    }

    /// # Panics
    /// On a cache miss if called outside of a tokio runtime.
    pub async fn resolve(&self, url: &str) -> ResultSharedImage {
        let flight = {
            let mut state = lock(&self.state);
            if let Some(im) = state.cache.get(url) {
                state.stats.n_hits += 1;
                tracing::debug!("cache hit {url}");
                return Ok(im);
            }
            if let Some(flight) = state.in_flight.get(url).cloned() {
                state.stats.n_coalesced += 1;
                tracing::debug!("joining running request for {url}");
                flight
            } else {
                state.stats.n_misses += 1;
                tracing::debug!("cache miss {url}");
                let flight = self.spawn_load(url);
                state.in_flight.insert(url.to_string(), flight.clone());
                flight
            }
        };
        flight.await
    }

    /// Starts downloading `url` in the background unless it is cached or already in flight.
    /// Returns whether a download has been started.
    ///
    /// # Panics
    /// If called outside of a tokio runtime.
    pub fn prefetch(&self, url: &str) -> bool {
        let mut state = lock(&self.state);
        if state.cache.contains(url) || state.in_flight.contains_key(url) {
            false
        } else {
            state.stats.n_prefetched += 1;
            tracing::debug!("prefetching {url}");
            let flight = self.spawn_load(url);
            state.in_flight.insert(url.to_string(), flight);
            true
        }
    }

    /// Must be called with the state locked such that the task can only finish after it has
    /// been registered as in flight.
    fn spawn_load(&self, url: &str) -> SharedLoad {
        let url = url.to_string();
        let fetcher = Arc::clone(&self.fetcher);
        let decoder = Arc::clone(&self.decoder);
        let state = Arc::clone(&self.state);
        let load_timeout = self.load_timeout;
        let handle = tokio::spawn(async move {
            let mut guard = InFlightGuard {
                state: Arc::clone(&state),
                url: Some(url.clone()),
            };
            let loaded = fetch_and_decode(fetcher, decoder, &url, load_timeout).await;
            guard.disarm();
            let mut state = lock(&state);
            state.in_flight.remove(&url);
            match &loaded {
                Ok(im) => {
                    tracing::info!("loaded {url} with shape {}x{}", im.width(), im.height());
                    state.cache.put(url, Arc::clone(im));
                }
                Err(e) => {
                    state.stats.n_failures += 1;
                    tracing::warn!("{e}");
                }
            }
            loaded
        });
        handle
            .map(|joined| match joined {
                Ok(loaded) => loaded,
                Err(e) => Err(dverr!(Load, "loading task failed due to {e:?}")),
            })
            .boxed()
            .shared()
    }

    pub fn n_in_flight(&self) -> usize {
        lock(&self.state).in_flight.len()
    }

    pub fn stats(&self) -> LoaderStats {
        let state = lock(&self.state);
        LoaderStats {
            n_cached: state.cache.len(),
            ..state.stats
        }
    }

    pub fn clear_cache(&self) {
        lock(&self.state).cache.clear();
    }

    pub fn load_timeout(&self) -> Duration {
        self.load_timeout
    }
}

#[cfg(test)]
use {
    crate::{
        reader::ImageCrateDecoder,
        result::{DvResult, ErrorKind},
        test_helpers::{make_loader, png_bytes, MockFetcher},
        tracing_setup::init_tracing_for_tests,
        LruImageCache, UnboundedCache,
    },
    std::sync::atomic::{AtomicUsize, Ordering},
};

#[cfg(test)]
#[tokio::test]
async fn test_second_resolve_is_cache_hit() {
    init_tracing_for_tests();
    let fetcher = Arc::new(MockFetcher::new());
    let loader = make_loader(fetcher.clone(), Duration::from_secs(5));
    assert!(loader.get_cached("a").is_none());
    let first = loader.resolve("a").await.unwrap();
    assert_eq!(fetcher.n_fetches("a"), 1);
    let second = loader.resolve("a").await.unwrap();
    assert_eq!(fetcher.n_fetches("a"), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(loader.get_cached("a").is_some());
    let stats = loader.stats();
    assert_eq!(stats.n_misses, 1);
    assert_eq!(stats.n_hits, 1);
    assert_eq!(stats.n_cached, 1);
    assert_eq!(loader.n_in_flight(), 0);
}

#[cfg(test)]
#[tokio::test]
async fn test_concurrent_resolves_are_coalesced() {
    init_tracing_for_tests();
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(100)));
    let loader = make_loader(fetcher.clone(), Duration::from_secs(5));
    let (a1, a2, a3, b) = futures::join!(
        loader.resolve("a"),
        loader.resolve("a"),
        loader.resolve("a"),
        loader.resolve("b")
    );
    let (a1, a2, a3) = (a1.unwrap(), a2.unwrap(), a3.unwrap());
    assert!(b.is_ok());
    assert_eq!(fetcher.n_fetches("a"), 1);
    assert_eq!(fetcher.n_fetches("b"), 1);
    assert!(Arc::ptr_eq(&a1, &a2) && Arc::ptr_eq(&a2, &a3));
    let stats = loader.stats();
    assert_eq!(stats.n_misses, 2);
    assert_eq!(stats.n_coalesced, 2);
}

#[cfg(test)]
#[tokio::test]
async fn test_coalesced_failure_reaches_all_waiters() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_delay(Duration::from_millis(50))
            .with_failing("a"),
    );
    let loader = make_loader(fetcher.clone(), Duration::from_secs(5));
    let (r1, r2) = futures::join!(loader.resolve("a"), loader.resolve("a"));
    assert_eq!(r1.unwrap_err().kind(), ErrorKind::Load);
    assert_eq!(r2.unwrap_err().kind(), ErrorKind::Load);
    assert_eq!(fetcher.n_fetches("a"), 1);
    assert_eq!(loader.stats().n_failures, 1);
}

#[cfg(test)]
#[tokio::test]
async fn test_failure_does_not_poison_cache() {
    init_tracing_for_tests();
    let fetcher = Arc::new(MockFetcher::new().with_failing("a"));
    let loader = make_loader(fetcher.clone(), Duration::from_secs(5));
    let e = loader.resolve("a").await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Load);
    assert!(loader.get_cached("a").is_none());
    fetcher.set_failing("a", false);
    assert!(loader.resolve("a").await.is_ok());
    assert_eq!(fetcher.n_fetches("a"), 2);
    assert!(loader.get_cached("a").is_some());
}

#[cfg(test)]
#[tokio::test]
async fn test_undecodable() {
    let fetcher = Arc::new(MockFetcher::new().with_undecodable("html"));
    let loader = make_loader(fetcher.clone(), Duration::from_secs(5));
    let e = loader.resolve("html").await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Load);
    assert!(e.msg().contains("cannot decode"));
    assert_eq!(loader.stats().n_cached, 0);
}

#[cfg(test)]
#[tokio::test]
async fn test_timeout() {
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(500)));
    let loader = make_loader(fetcher.clone(), Duration::from_millis(20));
    let e = loader.resolve("slow").await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Load);
    assert!(e.msg().contains("timeout"));
    assert!(loader.get_cached("slow").is_none());
    assert_eq!(loader.n_in_flight(), 0);
}

#[cfg(test)]
#[tokio::test]
async fn test_load_finishes_without_waiters() {
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(50)));
    let loader = make_loader(fetcher.clone(), Duration::from_secs(5));
    // the only waiter gives up before the download is done
    let gave_up = timeout(Duration::from_millis(5), loader.resolve("a")).await;
    assert!(gave_up.is_err());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(loader.get_cached("a").is_some());
    assert!(loader.resolve("a").await.is_ok());
    assert_eq!(fetcher.n_fetches("a"), 1);
}

#[cfg(test)]
#[tokio::test]
async fn test_lru_loader_refetches_evicted() {
    let fetcher = Arc::new(MockFetcher::new());
    let loader = Loader::new(
        Box::new(LruImageCache::new(1).unwrap()),
        fetcher.clone(),
        Arc::new(ImageCrateDecoder),
        Duration::from_secs(5),
    );
    loader.resolve("a").await.unwrap();
    loader.resolve("b").await.unwrap();
    loader.resolve("a").await.unwrap();
    assert_eq!(fetcher.n_fetches("a"), 2);
    assert_eq!(fetcher.n_fetches("b"), 1);
    assert_eq!(loader.stats().n_cached, 1);
    loader.clear_cache();
    assert_eq!(loader.stats().n_cached, 0);
}

#[cfg(test)]
#[tokio::test]
async fn test_prefetch() {
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(50)));
    let loader = make_loader(fetcher.clone(), Duration::from_secs(5));
    assert!(loader.prefetch("a"));
    assert!(!loader.prefetch("a"));
    // joins the prefetch instead of starting a second download
    loader.resolve("a").await.unwrap();
    assert!(!loader.prefetch("a"));
    assert_eq!(fetcher.n_fetches("a"), 1);
    let stats = loader.stats();
    assert_eq!(stats.n_prefetched, 1);
    assert_eq!(stats.n_coalesced, 1);
    assert_eq!(stats.n_misses, 0);
}

#[cfg(test)]
#[derive(Default)]
struct PanicsOnFirstCall {
    n_calls: AtomicUsize,
}
#[cfg(test)]
impl FetchBytes for PanicsOnFirstCall {
    fn fetch_bytes<'a>(&'a self, url: &'a str) -> BoxFuture<'a, DvResult<Vec<u8>>> {
        async move {
            if self.n_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("connection to {url} blew up");
            }
            Ok(png_bytes(2, 2))
        }
        .boxed()
    }
}

#[cfg(test)]
#[tokio::test]
async fn test_retry_after_panicked_load() {
    init_tracing_for_tests();
    let fetcher = Arc::new(PanicsOnFirstCall::default());
    let loader = Loader::new(
        Box::new(UnboundedCache::default()),
        fetcher.clone(),
        Arc::new(ImageCrateDecoder),
        Duration::from_secs(5),
    );
    let e = loader.resolve("a").await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Load);
    assert_eq!(loader.n_in_flight(), 0);
    assert!(loader.resolve("a").await.is_ok());
    assert_eq!(fetcher.n_calls.load(Ordering::SeqCst), 2);
    assert!(loader.get_cached("a").is_some());
}

#[cfg(test)]
#[tokio::test]
async fn test_get_cached_is_a_peek() {
    let fetcher = Arc::new(MockFetcher::new());
    let loader = Loader::new(
        Box::new(LruImageCache::new(2).unwrap()),
        fetcher.clone(),
        Arc::new(ImageCrateDecoder),
        Duration::from_secs(5),
    );
    loader.resolve("a").await.unwrap();
    loader.resolve("b").await.unwrap();
    // peeking at a must not protect it from eviction
    assert!(loader.get_cached("a").is_some());
    loader.resolve("c").await.unwrap();
    assert!(loader.get_cached("a").is_none());
    assert!(loader.get_cached("b").is_some());
    assert_eq!(loader.stats().n_hits, 0);
}
