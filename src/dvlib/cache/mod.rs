mod core;
mod lru_cache;
mod unbounded_cache;

pub use self::core::Cache;
pub use lru_cache::LruImageCache;
pub use unbounded_cache::UnboundedCache;
