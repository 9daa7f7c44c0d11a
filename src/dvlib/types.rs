use std::sync::Arc;

use image::DynamicImage;

use crate::result::DvResult;

/// Decoded images are shared between the cache and everybody who resolved them.
pub type SharedImage = Arc<DynamicImage>;
pub type ResultImage = DvResult<DynamicImage>;
pub type ResultSharedImage = DvResult<SharedImage>;

/// Snapshot of the navigation position, taken at once such that index and length always
/// belong to the same image list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavState {
    pub current_idx: Option<usize>,
    pub len: usize,
}
impl NavState {
    pub fn is_empty(&self) -> bool {
        self.current_idx.is_none()
    }
}

/// Counters of the loader. Coalesced requests and prefetches are neither hits nor misses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub n_hits: usize,
    pub n_misses: usize,
    pub n_coalesced: usize,
    pub n_prefetched: usize,
    pub n_failures: usize,
    pub n_cached: usize,
}
