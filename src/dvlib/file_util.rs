use crate::{dverr, result::DvResult};
use image::DynamicImage;
use lazy_static::lazy_static;
use std::{
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{error, info};

lazy_static! {
    pub static ref DEFAULT_TMPDIR: PathBuf = std::env::temp_dir().join("dogview");
}
lazy_static! {
    pub static ref DEFAULT_HOMEDIR: PathBuf = match dirs::home_dir() {
        Some(p) => p.join(".dogview"),
        _ => std::env::temp_dir().join("dogview"),
    };
}

pub fn read_to_string<P>(p: P) -> DvResult<String>
where
    P: AsRef<Path> + Debug,
{
    fs::read_to_string(&p).map_err(|e| dverr!(Other, "could not read {:?} due to {:?}", p, e))
}

pub fn write<P, C>(path: P, contents: C) -> DvResult<()>
where
    P: AsRef<Path> + Debug,
    C: AsRef<[u8]>,
{
    fs::write(&path, contents)
        .map_err(|e| dverr!(Other, "could not write to {:?} since {:?}", path, e))
}

/// Last path segment of a url, e.g., `n02085620_1.jpg` for
/// `https://images.dog.ceo/breeds/chihuahua/n02085620_1.jpg`.
pub fn url_file_name(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}

/// Saves the image into `folder` under the file name of its url. The image format is derived
/// from the extension, so urls without a known image extension get `.png` appended.
pub fn save_image(im: &DynamicImage, url: &str, folder: &Path) -> DvResult<PathBuf> {
    let name = url_file_name(url).ok_or_else(|| dverr!(Other, "url {url} has no file name"))?;
    let has_known_ext = image::ImageFormat::from_path(name).is_ok();
    let name = if has_known_ext {
        name.to_string()
    } else {
        format!("{name}.png")
    };
    fs::create_dir_all(folder)
        .map_err(|e| dverr!(Other, "could not create {:?} due to {:?}", folder, e))?;
    let path = folder.join(name);
    im.save(&path)
        .map_err(|e| dverr!(Other, "could not save image to {:?}. {}", path, e))?;
    info!("saved {url} to {path:?}");
    Ok(path)
}

pub struct Defer<F: FnMut()> {
    pub func: F,
}
impl<F: FnMut()> Drop for Defer<F> {
    fn drop(&mut self) {
        (self.func)();
    }
}
#[macro_export]
macro_rules! defer {
    ($f:expr) => {
        let _dfr = $crate::file_util::Defer { func: $f };
    };
}
pub fn checked_remove<'a, P: AsRef<Path> + Debug>(
    path: &'a P,
    func: fn(p: &'a P) -> io::Result<()>,
) {
    match func(path) {
        Ok(_) => info!("removed {path:?}"),
        Err(e) => error!("could not remove {path:?} due to {e:?}"),
    }
}
#[macro_export]
macro_rules! defer_folder_removal {
    ($path:expr) => {
        let func = || $crate::file_util::checked_remove($path, std::fs::remove_dir_all);
        $crate::defer!(func);
    };
}

#[test]
fn test_url_file_name() {
    assert_eq!(
        url_file_name("https://images.dog.ceo/breeds/chihuahua/n02085620_1.jpg"),
        Some("n02085620_1.jpg")
    );
    assert_eq!(url_file_name("https://x.org/a/b.png?size=2"), Some("b.png"));
    assert_eq!(url_file_name("https://x.org/a/"), None);
    assert_eq!(url_file_name("plain"), Some("plain"));
}

#[cfg(test)]
use {
    crate::tracing_setup::init_tracing_for_tests,
    image::{ImageBuffer, Rgb},
};

#[test]
fn test_save_image() {
    init_tracing_for_tests();
    let folder = DEFAULT_TMPDIR.join("test_save_image");
    defer_folder_removal!(&folder);
    let im = DynamicImage::ImageRgb8(ImageBuffer::<Rgb<u8>, Vec<u8>>::new(3, 2));
    let p = save_image(&im, "https://x.org/dogs/puppy.png", &folder).unwrap();
    assert!(p.ends_with("puppy.png"));
    assert!(p.exists());
    let p = save_image(&im, "https://x.org/dogs/puppy", &folder).unwrap();
    assert!(p.ends_with("puppy.png"));
    let loaded = image::open(&p).unwrap();
    assert_eq!((loaded.width(), loaded.height()), (3, 2));
    assert!(save_image(&im, "https://x.org/dogs/", &folder).is_err());
}
