//! In-memory stand-ins for the network used by unit and integration tests.
use std::{
    collections::{HashMap, HashSet},
    io::Cursor,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use futures::{future::BoxFuture, FutureExt};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};

use crate::{
    control::Navigator,
    dverr,
    loader::Loader,
    reader::{FetchBytes, FetchImageUrls, ImageCrateDecoder},
    result::DvResult,
    types::SharedImage,
    UnboundedCache,
};

pub fn dummy_image(w: u32, h: u32) -> SharedImage {
    Arc::new(DynamicImage::ImageRgb8(
        ImageBuffer::<Rgb<u8>, Vec<u8>>::new(w, h),
    ))
}

pub fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let mut bytes = vec![];
    dummy_image(w, h)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Hands out the prepared url lists one after the other. Once they are used up, every call
/// fails.
#[derive(Default)]
pub struct MockUrlSource {
    responses: Mutex<Vec<DvResult<Vec<String>>>>,
    n_calls: AtomicUsize,
}
impl MockUrlSource {
    pub fn new(mut responses: Vec<DvResult<Vec<String>>>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            n_calls: AtomicUsize::new(0),
        }
    }
    pub fn n_calls(&self) -> usize {
        self.n_calls.load(Ordering::SeqCst)
    }
}
impl FetchImageUrls for MockUrlSource {
    fn fetch_image_urls(&self, count: usize) -> BoxFuture<'_, DvResult<Vec<String>>> {
        self.n_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop();
        async move {
            match next {
                Some(Ok(urls)) => Ok(urls.into_iter().take(count).collect()),
                Some(Err(e)) => Err(e),
                None => Err(dverr!(Fetch, "no more prepared responses")),
            }
        }
        .boxed()
    }
}

/// Serves the same small png for every url except for the broken ones. Every request is
/// counted per url and can be delayed to keep it in flight.
#[derive(Default)]
pub struct MockFetcher {
    delay: Option<Duration>,
    failing: Mutex<HashSet<String>>,
    undecodable: HashSet<String>,
    n_fetches: Mutex<HashMap<String, usize>>,
}
impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
    pub fn with_failing(self, url: &str) -> Self {
        self.set_failing(url, true);
        self
    }
    pub fn with_undecodable(mut self, url: &str) -> Self {
        self.undecodable.insert(url.to_string());
        self
    }
    pub fn set_failing(&self, url: &str, failing: bool) {
        let mut failing_urls = self.failing.lock().unwrap();
        if failing {
            failing_urls.insert(url.to_string());
        } else {
            failing_urls.remove(url);
        }
    }
    pub fn n_fetches(&self, url: &str) -> usize {
        self.n_fetches
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }
    pub fn n_fetches_total(&self) -> usize {
        self.n_fetches.lock().unwrap().values().sum()
    }
}
impl FetchBytes for MockFetcher {
    fn fetch_bytes<'a>(&'a self, url: &'a str) -> BoxFuture<'a, DvResult<Vec<u8>>> {
        *self
            .n_fetches
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;
        let fails = self.failing.lock().unwrap().contains(url);
        async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if fails {
                Err(dverr!(Load, "cannot reach {url}"))
            } else if self.undecodable.contains(url) {
                Ok(b"<html>not an image</html>".to_vec())
            } else {
                Ok(png_bytes(2, 2))
            }
        }
        .boxed()
    }
}

pub fn urls(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

pub fn make_loader(fetcher: Arc<MockFetcher>, timeout: Duration) -> Arc<Loader> {
    Arc::new(Loader::new(
        Box::new(UnboundedCache::default()),
        fetcher,
        Arc::new(ImageCrateDecoder),
        timeout,
    ))
}

pub fn make_navigator(
    responses: Vec<DvResult<Vec<String>>>,
    fetcher: Arc<MockFetcher>,
) -> (Navigator, Arc<MockUrlSource>) {
    let source = Arc::new(MockUrlSource::new(responses));
    let loader = make_loader(fetcher, Duration::from_secs(5));
    (Navigator::new(source.clone(), loader), source)
}
