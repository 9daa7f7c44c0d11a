use std::sync::Arc;

use super::{DogApiReader, HttpReader, ImageCrateDecoder};
use crate::{
    cache::{Cache, LruImageCache, UnboundedCache},
    cfg::{CacheKind, Cfg},
    control::Navigator,
    loader::Loader,
    result::DvResult,
};

fn cache_from_cfg(cfg: &Cfg) -> DvResult<Box<dyn Cache + Send>> {
    Ok(match cfg.cache {
        CacheKind::Lru => Box::new(LruImageCache::new(cfg.cache_capacity)?),
        CacheKind::Unbounded => Box::new(UnboundedCache::default()),
    })
}

pub fn loader_from_cfg(cfg: &Cfg) -> DvResult<Arc<Loader>> {
    Ok(Arc::new(Loader::new(
        cache_from_cfg(cfg)?,
        Arc::new(HttpReader::new()?),
        Arc::new(ImageCrateDecoder),
        cfg.load_timeout(),
    )))
}

/// Wires the dog API, the http image reader and the cache configured in `cfg` into a
/// navigator.
pub fn navigator_from_cfg(cfg: &Cfg) -> DvResult<Navigator> {
    let url_source = DogApiReader::new(&cfg.api_base_url, cfg.breed.clone(), cfg.list_timeout())?;
    tracing::info!(
        "using {:?} cache, loading with timeout {:?}",
        cfg.cache,
        cfg.load_timeout()
    );
    Ok(Navigator::new(Arc::new(url_source), loader_from_cfg(cfg)?).with_prefetch(cfg.n_prefetch))
}

#[test]
fn test_from_cfg() {
    let cfg = Cfg::default();
    let nav = navigator_from_cfg(&cfg).unwrap();
    assert!(nav.is_empty());
    assert_eq!(nav.loader().load_timeout(), cfg.load_timeout());
    let mut cfg = Cfg::default();
    cfg.cache = CacheKind::Unbounded;
    cfg.cache_capacity = 0;
    assert!(loader_from_cfg(&cfg).is_ok());
    cfg.cache = CacheKind::Lru;
    assert!(loader_from_cfg(&cfg).is_err());
}
