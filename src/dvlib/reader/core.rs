use futures::future::BoxFuture;

use crate::{
    result::{to_dv, DvResult, ErrorKind},
    types::ResultImage,
};

/// Source of image urls, e.g., the random image endpoint of the dog API.
pub trait FetchImageUrls {
    /// Fetches `count` urls. The order of the returned list is the display order.
    fn fetch_image_urls(&self, count: usize) -> BoxFuture<'_, DvResult<Vec<String>>>;
}

/// Downloads the raw bytes behind a url.
pub trait FetchBytes {
    fn fetch_bytes<'a>(&'a self, url: &'a str) -> BoxFuture<'a, DvResult<Vec<u8>>>;
}

/// Turns raw bytes into an image. Decoding is CPU bound, hence synchronous. The loader moves it
/// to the blocking thread pool.
pub trait DecodeImage {
    fn decode(&self, bytes: &[u8]) -> ResultImage;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCrateDecoder;

impl DecodeImage for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> ResultImage {
        image::load_from_memory(bytes).map_err(to_dv(ErrorKind::Load))
    }
}

#[test]
fn test_decode() {
    let decoder = ImageCrateDecoder;
    let bytes = crate::test_helpers::png_bytes(4, 3);
    let im = decoder.decode(&bytes).unwrap();
    assert_eq!((im.width(), im.height()), (4, 3));
    let e = decoder.decode(b"no image at all").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Load);
}
