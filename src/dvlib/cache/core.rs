use crate::types::SharedImage;

/// In-memory storage of decoded images keyed by their url. Implementations decide about
/// eviction, the loader decides about what is stored.
pub trait Cache {
    /// Returns the image and marks it as recently used.
    fn get(&mut self, url: &str) -> Option<SharedImage>;
    /// Returns the image without touching the eviction order.
    fn peek(&self, url: &str) -> Option<SharedImage>;
    fn put(&mut self, url: String, im: SharedImage);
    fn contains(&self, url: &str) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn clear(&mut self);
}
