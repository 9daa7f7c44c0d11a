use futures::{future::BoxFuture, FutureExt};

use super::core::FetchBytes;
use crate::{
    dverr,
    result::{to_dv, DvResult, ErrorKind},
};

#[derive(Clone, Default)]
pub struct HttpReader {
    client: reqwest::Client,
}

impl HttpReader {
    pub fn new() -> DvResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(to_dv(ErrorKind::Other))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> DvResult<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| dverr!(Load, "http reader cannot read {url} due to {e:?}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(dverr!(Load, "{url} returned {status}"));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| dverr!(Load, "cannot read body of {url} due to {e:?}"))?;
        tracing::debug!("downloaded {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}

impl FetchBytes for HttpReader {
    fn fetch_bytes<'a>(&'a self, url: &'a str) -> BoxFuture<'a, DvResult<Vec<u8>>> {
        self.get(url).boxed()
    }
}

#[cfg(test)]
#[tokio::test]
async fn test_unreachable() {
    let reader = HttpReader::new().unwrap();
    let e = reader
        .fetch_bytes("http://127.0.0.1:9/dog.jpg")
        .await
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Load);
}
