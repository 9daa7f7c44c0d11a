mod cache;
pub mod cfg;
pub mod control;
pub mod file_util;
pub mod loader;
pub mod reader;
pub mod result;
pub mod test_helpers;
pub mod tracing_setup;
mod types;
pub mod view;
pub use cache::{Cache, LruImageCache, UnboundedCache};
pub use control::Navigator;
pub use loader::Loader;
pub use types::{LoaderStats, NavState, ResultImage, ResultSharedImage, SharedImage};
