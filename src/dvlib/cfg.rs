use crate::{
    dverr,
    file_util::{self, DEFAULT_HOMEDIR},
    result::DvResult,
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, warn};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    /// Evicts the least recently used image once `cache_capacity` is reached.
    #[default]
    Lru,
    /// Keeps every image that was ever resolved.
    Unbounded,
}

const CFG_DEFAULT: &str = r#"
    api_base_url = "https://dog.ceo/api"
    # breed = "hound"
    max_count = 10
    load_timeout_s = 30
    list_timeout_s = 30
    cache = "Lru"  # "Lru" or "Unbounded"
    cache_capacity = 64
    n_prefetch = 1
    # save_dir =
    "#;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Cfg {
    pub api_base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    pub max_count: usize,
    pub load_timeout_s: u64,
    pub list_timeout_s: u64,
    #[serde(default)]
    pub cache: CacheKind,
    pub cache_capacity: usize,
    /// Images after the current one that are loaded in the background.
    #[serde(default)]
    pub n_prefetch: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,
}
impl Cfg {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_s)
    }
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_s)
    }
    pub fn save_dir(&self) -> PathBuf {
        self.save_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_HOMEDIR.join("saved"))
    }
}
impl Default for Cfg {
    fn default() -> Self {
        toml::from_str(CFG_DEFAULT).expect("default config broken")
    }
}

pub fn get_cfg_path() -> PathBuf {
    DEFAULT_HOMEDIR.join("dv_cfg.toml")
}

pub fn get_log_folder() -> PathBuf {
    DEFAULT_HOMEDIR.join("logs")
}

pub fn parse_cfg(toml_str: &str) -> DvResult<Cfg> {
    let cfg: Cfg =
        toml::from_str(toml_str).map_err(|e| dverr!(Other, "could not parse cfg due to {:?}", e))?;
    if cfg.max_count == 0 {
        return Err(dverr!(Other, "max_count needs to be at least 1"));
    }
    if cfg.load_timeout_s == 0 || cfg.list_timeout_s == 0 {
        return Err(dverr!(Other, "timeouts need to be at least 1 second"));
    }
    if cfg.cache == CacheKind::Lru && cfg.cache_capacity == 0 {
        return Err(dverr!(Other, "an lru cache needs a capacity of at least 1"));
    }
    Ok(cfg)
}

pub fn read_cfg_from_path(cfg_toml_path: &Path) -> DvResult<Cfg> {
    if cfg_toml_path.exists() {
        let toml_str = file_util::read_to_string(cfg_toml_path)?;
        let cfg = parse_cfg(&toml_str)?;
        info!("read cfg from {cfg_toml_path:?}");
        Ok(cfg)
    } else {
        warn!("cfg {cfg_toml_path:?} file does not exist. using default cfg");
        Ok(Cfg::default())
    }
}

pub fn read_cfg() -> DvResult<Cfg> {
    read_cfg_from_path(&get_cfg_path())
}

pub fn write_cfg(cfg: &Cfg, p: &Path) -> DvResult<()> {
    let cfg_str = toml::to_string_pretty(cfg).map_err(|e| dverr!(Other, "{:?}", e))?;
    file_util::write(p, cfg_str)?;
    info!("wrote cfg to {p:?}");
    Ok(())
}

#[cfg(test)]
use crate::{defer_folder_removal, file_util::DEFAULT_TMPDIR};

#[test]
fn test_default_cfg() {
    let cfg = Cfg::default();
    assert_eq!(cfg.api_base_url, "https://dog.ceo/api");
    assert_eq!(cfg.breed, None);
    assert_eq!(cfg.max_count, 10);
    assert_eq!(cfg.cache, CacheKind::Lru);
    assert_eq!(cfg.cache_capacity, 64);
    assert_eq!(cfg.n_prefetch, 1);
    assert_eq!(cfg.load_timeout(), Duration::from_secs(30));
    assert!(cfg.save_dir().ends_with("saved"));
}

#[test]
fn test_parse_cfg() {
    let cfg = parse_cfg(
        r#"
        api_base_url = "http://localhost:8080/api"
        breed = "hound"
        max_count = 5
        load_timeout_s = 1
        list_timeout_s = 2
        cache = "Unbounded"
        cache_capacity = 0
        "#,
    )
    .unwrap();
    assert_eq!(cfg.breed.as_deref(), Some("hound"));
    assert_eq!(cfg.cache, CacheKind::Unbounded);
    assert_eq!(cfg.n_prefetch, 0);
    assert_eq!(cfg.list_timeout(), Duration::from_secs(2));
    let broken = CFG_DEFAULT.replace("cache_capacity = 64", "cache_capacity = 0");
    assert!(parse_cfg(&broken).is_err());
    let broken = CFG_DEFAULT.replace("max_count = 10", "max_count = 0");
    assert!(parse_cfg(&broken).is_err());
    let broken = CFG_DEFAULT.replace("load_timeout_s = 30", "load_timeout_s = 0");
    assert!(parse_cfg(&broken).is_err());
    let broken = CFG_DEFAULT.replace("list_timeout_s = 30", "list_timeout_s = 0");
    assert!(parse_cfg(&broken).is_err());
    assert!(parse_cfg("max_count = 3").is_err());
}

#[test]
fn test_read_write_cfg() {
    let folder = DEFAULT_TMPDIR.join("test_read_write_cfg");
    std::fs::create_dir_all(&folder).unwrap();
    defer_folder_removal!(&folder);
    let path = folder.join("dv_cfg.toml");
    assert_eq!(read_cfg_from_path(&path).unwrap(), Cfg::default());
    let mut cfg = Cfg::default();
    cfg.max_count = 3;
    cfg.save_dir = Some(folder.join("out"));
    write_cfg(&cfg, &path).unwrap();
    assert_eq!(read_cfg_from_path(&path).unwrap(), cfg);
}
