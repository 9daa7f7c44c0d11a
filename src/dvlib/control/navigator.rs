use std::sync::Arc;

use crate::{
    dverr,
    loader::Loader,
    reader::FetchImageUrls,
    result::{DvResult, ErrorKind},
    types::{NavState, ResultSharedImage},
};

fn next(idx: usize, len: usize) -> Option<usize> {
    (idx + 1 < len).then_some(idx + 1)
}

fn prev(idx: usize, len: usize) -> Option<usize> {
    (idx > 0 && idx <= len).then(|| idx - 1)
}

/// Owns the fetched image urls and the position of the displayed image.
///
/// The position only changes if the target exists. Moving succeeds even if the image at the new
/// position cannot be loaded, position and image availability are independent.
pub struct Navigator {
    image_urls: Vec<String>,
    current_idx: Option<usize>,
    n_prefetch: usize,
    url_source: Arc<dyn FetchImageUrls + Send + Sync>,
    loader: Arc<Loader>,
}

impl Navigator {
    pub fn new(url_source: Arc<dyn FetchImageUrls + Send + Sync>, loader: Arc<Loader>) -> Self {
        Self {
            image_urls: vec![],
            current_idx: None,
            n_prefetch: 0,
            url_source,
            loader,
        }
    }

    /// Number of images after the current one that are loaded in the background.
    pub fn with_prefetch(mut self, n_prefetch: usize) -> Self {
        self.n_prefetch = n_prefetch;
        self
    }

    /// Replaces the image list by `count` new urls and moves to the first one. Returns the
    /// number of urls received. Nothing changes if the url source fails.
    pub async fn fetch(&mut self, count: usize) -> DvResult<usize> {
        let image_urls = self
            .url_source
            .fetch_image_urls(count)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::Fetch => e,
                _ => dverr!(Fetch, "{}", e.msg()),
            })?;
        if image_urls.len() != count {
            tracing::warn!("requested {count} urls but received {}", image_urls.len());
        }
        self.current_idx = if image_urls.is_empty() {
            None
        } else {
            Some(0)
        };
        self.image_urls = image_urls;
        tracing::info!("fetched {} image urls", self.image_urls.len());
        self.prefetch();
        Ok(self.image_urls.len())
    }

    /// Resolves the image at the current position.
    pub async fn current(&self) -> ResultSharedImage {
        let url = self
            .current_url()
            .ok_or_else(|| dverr!(OutOfRange, "no images fetched yet"))?;
        self.loader.resolve(url).await
    }

    fn move_to(&mut self, f: fn(usize, usize) -> Option<usize>, direction: &str) -> DvResult<()> {
        let len = self.len();
        let idx = self
            .current_idx
            .ok_or_else(|| dverr!(OutOfRange, "no images fetched yet"))?;
        let new_idx = f(idx, len)
            .ok_or_else(|| dverr!(OutOfRange, "no {direction} image, at {}/{len}", idx + 1))?;
        self.current_idx = Some(new_idx);
        tracing::debug!("moved to {}/{len}", new_idx + 1);
        self.prefetch();
        Ok(())
    }

    pub async fn next(&mut self) -> ResultSharedImage {
        self.move_to(next, "next")?;
        self.current().await
    }

    pub async fn previous(&mut self) -> ResultSharedImage {
        self.move_to(prev, "previous")?;
        self.current().await
    }

    /// Jumps to `idx` if it exists.
    pub async fn select(&mut self, idx: usize) -> ResultSharedImage {
        let len = self.len();
        if idx >= len {
            return Err(dverr!(OutOfRange, "cannot select image {} of {len}", idx + 1));
        }
        self.current_idx = Some(idx);
        self.prefetch();
        self.current().await
    }

    fn prefetch(&self) {
        if let Some(idx) = self.current_idx {
            for url in self.image_urls.iter().skip(idx + 1).take(self.n_prefetch) {
                self.loader.prefetch(url);
            }
        }
    }

    pub fn current_idx(&self) -> Option<usize> {
        self.current_idx
    }
    pub fn len(&self) -> usize {
        self.image_urls.len()
    }
    pub fn is_empty(&self) -> bool {
        self.image_urls.is_empty()
    }
    pub fn nav_state(&self) -> NavState {
        NavState {
            current_idx: self.current_idx,
            len: self.len(),
        }
    }
    pub fn current_url(&self) -> Option<&str> {
        self.current_idx
            .and_then(|idx| self.image_urls.get(idx))
            .map(|s| s.as_str())
    }
    pub fn image_urls(&self) -> &[String] {
        &self.image_urls
    }
    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }
}

#[test]
fn test_prev_next() {
    assert_eq!(next(3, 4), None);
    assert_eq!(next(2, 4), Some(3));
    assert_eq!(next(5, 4), None);
    assert_eq!(next(0, 1), None);
    assert_eq!(next(0, 0), None);
    assert_eq!(prev(3, 4), Some(2));
    assert_eq!(prev(1, 3), Some(0));
    assert_eq!(prev(0, 3), None);
    assert_eq!(prev(4, 3), None);
}

#[cfg(test)]
use {
    crate::test_helpers::{make_navigator, urls, MockFetcher},
    crate::tracing_setup::init_tracing_for_tests,
    std::time::Duration,
};

#[cfg(test)]
#[tokio::test]
async fn test_empty() {
    init_tracing_for_tests();
    let (mut nav, _) = make_navigator(vec![], Arc::new(MockFetcher::new()));
    assert!(nav.is_empty());
    assert_eq!(nav.nav_state(), NavState::default());
    assert!(nav.current().await.unwrap_err().is_out_of_range());
    assert!(nav.next().await.unwrap_err().is_out_of_range());
    assert!(nav.previous().await.unwrap_err().is_out_of_range());
    assert!(nav.select(0).await.unwrap_err().is_out_of_range());
    assert_eq!(nav.current_idx(), None);
}

#[cfg(test)]
#[tokio::test]
async fn test_fetch_failure_keeps_state() {
    let fetcher = Arc::new(MockFetcher::new());
    let responses = vec![
        Ok(urls(&["a", "b"])),
        Err(dverr!(Other, "network down")),
    ];
    let (mut nav, source) = make_navigator(responses, fetcher);
    assert_eq!(nav.fetch(2).await.unwrap(), 2);
    nav.next().await.unwrap();
    let e = nav.fetch(2).await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Fetch);
    assert_eq!(e.msg(), "network down");
    assert_eq!(nav.current_idx(), Some(1));
    assert_eq!(nav.image_urls(), &urls(&["a", "b"])[..]);
    assert_eq!(source.n_calls(), 2);
}

#[cfg(test)]
#[tokio::test]
async fn test_empty_fetch_resets() {
    let fetcher = Arc::new(MockFetcher::new());
    let (mut nav, _) = make_navigator(vec![Ok(urls(&["a", "b"])), Ok(vec![])], fetcher);
    nav.fetch(2).await.unwrap();
    nav.next().await.unwrap();
    assert_eq!(nav.fetch(0).await.unwrap(), 0);
    assert_eq!(
        nav.nav_state(),
        NavState {
            current_idx: None,
            len: 0
        }
    );
    assert!(nav.current().await.unwrap_err().is_out_of_range());
}

#[cfg(test)]
#[tokio::test]
async fn test_load_error_still_moves() {
    let fetcher = Arc::new(MockFetcher::new().with_failing("b"));
    let (mut nav, _) = make_navigator(vec![Ok(urls(&["a", "b", "c"]))], fetcher.clone());
    nav.fetch(3).await.unwrap();
    let e = nav.next().await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Load);
    assert_eq!(nav.current_idx(), Some(1));
    assert_eq!(nav.current_url(), Some("b"));
    nav.next().await.unwrap();
    assert_eq!(nav.current_idx(), Some(2));
    fetcher.set_failing("b", false);
    nav.previous().await.unwrap();
    assert_eq!(fetcher.n_fetches("b"), 2);
}

#[cfg(test)]
#[tokio::test]
async fn test_select() {
    let fetcher = Arc::new(MockFetcher::new());
    let (mut nav, _) = make_navigator(vec![Ok(urls(&["a", "b", "c"]))], fetcher);
    nav.fetch(3).await.unwrap();
    nav.select(2).await.unwrap();
    assert_eq!(nav.current_url(), Some("c"));
    assert!(nav.select(3).await.unwrap_err().is_out_of_range());
    assert_eq!(nav.current_idx(), Some(2));
}

#[cfg(test)]
#[tokio::test]
async fn test_prefetch_next_images() {
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(10)));
    let (nav, _) = make_navigator(vec![Ok(urls(&["a", "b", "c", "d"]))], fetcher.clone());
    let mut nav = nav.with_prefetch(2);
    nav.fetch(4).await.unwrap();
    nav.current().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(nav.loader().get_cached("b").is_some());
    assert!(nav.loader().get_cached("c").is_some());
    assert!(nav.loader().get_cached("d").is_none());
    nav.next().await.unwrap();
    nav.next().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(nav.loader().get_cached("d").is_some());
    assert_eq!(fetcher.n_fetches_total(), 4);
}
