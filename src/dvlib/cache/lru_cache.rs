use std::num::NonZeroUsize;

use lru::LruCache;

use super::Cache;
use crate::{dverr, result::DvResult, types::SharedImage};

pub struct LruImageCache {
    ims: LruCache<String, SharedImage>,
}
impl LruImageCache {
    pub fn new(capacity: usize) -> DvResult<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| dverr!(Other, "lru cache capacity must not be 0"))?;
        Ok(Self {
            ims: LruCache::new(capacity),
        })
    }
    pub fn capacity(&self) -> usize {
        self.ims.cap().get()
    }
}
impl Cache for LruImageCache {
    fn get(&mut self, url: &str) -> Option<SharedImage> {
        self.ims.get(url).cloned()
    }
    fn peek(&self, url: &str) -> Option<SharedImage> {
        self.ims.peek(url).cloned()
    }
    fn put(&mut self, url: String, im: SharedImage) {
        if let Some((evicted, _)) = self.ims.push(url, im) {
            // push also hands back the old entry of a replaced url
            if !self.ims.contains(&evicted) {
                tracing::debug!("evicted {evicted} from cache");
            }
        }
    }
    fn contains(&self, url: &str) -> bool {
        self.ims.contains(url)
    }
    fn len(&self) -> usize {
        self.ims.len()
    }
    fn clear(&mut self) {
        tracing::info!("clearing cache");
        self.ims.clear();
    }
}

#[cfg(test)]
use {crate::test_helpers::dummy_image, std::sync::Arc};

#[test]
fn test_lru_eviction() {
    assert!(LruImageCache::new(0).is_err());
    let mut cache = LruImageCache::new(2).unwrap();
    assert_eq!(cache.capacity(), 2);
    assert!(cache.is_empty());
    cache.put("a".into(), dummy_image(1, 1));
    cache.put("b".into(), dummy_image(2, 2));
    // touch a such that b is the least recently used one
    assert!(cache.get("a").is_some());
    cache.put("c".into(), dummy_image(3, 3));
    assert_eq!(cache.len(), 2);
    assert!(cache.contains("a"));
    assert!(!cache.contains("b"));
    assert!(cache.contains("c"));
    assert_eq!(cache.get("c").map(|im| im.width()), Some(3));
}

#[test]
fn test_lru_replace_same_url() {
    let mut cache = LruImageCache::new(2).unwrap();
    let first = dummy_image(1, 1);
    cache.put("a".into(), first.clone());
    cache.put("a".into(), dummy_image(5, 5));
    assert_eq!(cache.len(), 1);
    let stored = cache.get("a").unwrap();
    assert!(!Arc::ptr_eq(&stored, &first));
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_lru_peek_keeps_order() {
    let mut cache = LruImageCache::new(2).unwrap();
    cache.put("a".into(), dummy_image(1, 1));
    cache.put("b".into(), dummy_image(2, 2));
    assert!(cache.peek("a").is_some());
    cache.put("c".into(), dummy_image(3, 3));
    assert!(!cache.contains("a"));
    assert!(cache.peek("b").is_some());
}
