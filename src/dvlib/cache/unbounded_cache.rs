use std::collections::HashMap;

use super::Cache;
use crate::types::SharedImage;

/// Never evicts. Memory grows with every distinct url.
#[derive(Default)]
pub struct UnboundedCache {
    ims: HashMap<String, SharedImage>,
}
impl Cache for UnboundedCache {
    fn get(&mut self, url: &str) -> Option<SharedImage> {
        self.ims.get(url).cloned()
    }
    fn peek(&self, url: &str) -> Option<SharedImage> {
        self.ims.get(url).cloned()
    }
    fn put(&mut self, url: String, im: SharedImage) {
        self.ims.insert(url, im);
    }
    fn contains(&self, url: &str) -> bool {
        self.ims.contains_key(url)
    }
    fn len(&self) -> usize {
        self.ims.len()
    }
    fn clear(&mut self) {
        tracing::info!("clearing cache");
        self.ims.clear();
    }
}

#[test]
fn test_unbounded() {
    let mut cache = UnboundedCache::default();
    for i in 0..100 {
        cache.put(format!("{i}.jpg"), crate::test_helpers::dummy_image(1, 1));
    }
    assert_eq!(cache.len(), 100);
    assert!(cache.contains("0.jpg"));
    assert!(cache.get("99.jpg").is_some());
    assert!(cache.get("100.jpg").is_none());
}
