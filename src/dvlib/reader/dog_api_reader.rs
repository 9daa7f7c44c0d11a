use std::time::Duration;

use futures::{future::BoxFuture, FutureExt};
use serde::Deserialize;
use url::Url;

use super::core::FetchImageUrls;
use crate::{
    dverr,
    result::{to_dv, DvResult, ErrorKind},
};

const STATUS_SUCCESS: &str = "success";

#[derive(Deserialize, Debug)]
struct RandomImagesResponse {
    message: Vec<String>,
    status: String,
}

/// Parses the body of `breeds/image/random/{count}`, e.g.,
/// `{"message": ["https://images.dog.ceo/breeds/..."], "status": "success"}`.
pub fn parse_random_images(body: &str) -> DvResult<Vec<String>> {
    let resp = serde_json::from_str::<RandomImagesResponse>(body)
        .map_err(|e| dverr!(Fetch, "could not parse dog api response due to {:?}", e))?;
    if resp.status != STATUS_SUCCESS {
        return Err(dverr!(Fetch, "dog api returned status '{}'", resp.status));
    }
    for url in &resp.message {
        Url::parse(url).map_err(|e| dverr!(Fetch, "invalid image url '{url}', {e}"))?;
    }
    Ok(resp.message)
}

#[derive(Clone)]
pub struct DogApiReader {
    client: reqwest::Client,
    api_base_url: String,
    breed: Option<String>,
}

impl DogApiReader {
    pub fn new(api_base_url: &str, breed: Option<String>, timeout: Duration) -> DvResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(to_dv(ErrorKind::Other))?;
        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            breed,
        })
    }

    pub fn endpoint(&self, count: usize) -> String {
        match &self.breed {
            Some(breed) => format!(
                "{}/breed/{}/images/random/{count}",
                self.api_base_url,
                breed.trim()
            ),
            None => format!("{}/breeds/image/random/{count}", self.api_base_url),
        }
    }

    async fn get(&self, count: usize) -> DvResult<Vec<String>> {
        if count == 0 {
            return Ok(vec![]);
        }
        let endpoint = self.endpoint(count);
        tracing::debug!("requesting {endpoint}");
        let resp = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| dverr!(Fetch, "request to {endpoint} failed due to {e:?}"))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| dverr!(Fetch, "cannot read body of {endpoint} due to {e:?}"))?;
        if !status.is_success() {
            return Err(dverr!(Fetch, "{endpoint} returned {status}: {body}"));
        }
        let urls = parse_random_images(&body)?;
        tracing::info!("retrieved {} image urls", urls.len());
        Ok(urls)
    }
}

impl FetchImageUrls for DogApiReader {
    fn fetch_image_urls(&self, count: usize) -> BoxFuture<'_, DvResult<Vec<String>>> {
        self.get(count).boxed()
    }
}

#[test]
fn test_parse() {
    let body = r#"{"message":["https://images.dog.ceo/breeds/hound-afghan/n02088094_1003.jpg","https://images.dog.ceo/breeds/pug/n02110958_1975.jpg"],"status":"success"}"#;
    let urls = parse_random_images(body).unwrap();
    assert_eq!(urls.len(), 2);
    assert!(urls[1].ends_with("n02110958_1975.jpg"));

    let body = r#"{"message":"Breed not found (master breed does not exist)","status":"error","code":404}"#;
    assert_eq!(
        parse_random_images(body).unwrap_err().kind(),
        ErrorKind::Fetch
    );
    let body = r#"{"message":[],"status":"error"}"#;
    assert!(parse_random_images(body).is_err());
    let body = r#"{"message":["not a url"],"status":"success"}"#;
    assert!(parse_random_images(body).is_err());
    assert!(parse_random_images("<html></html>").is_err());
    let body = r#"{"message":[],"status":"success"}"#;
    assert_eq!(parse_random_images(body).unwrap(), Vec::<String>::new());
}

#[test]
fn test_endpoint() {
    let timeout = Duration::from_secs(1);
    let reader = DogApiReader::new("https://dog.ceo/api/", None, timeout).unwrap();
    assert_eq!(
        reader.endpoint(3),
        "https://dog.ceo/api/breeds/image/random/3"
    );
    let reader = DogApiReader::new("https://dog.ceo/api", Some("hound".into()), timeout).unwrap();
    assert_eq!(
        reader.endpoint(10),
        "https://dog.ceo/api/breed/hound/images/random/10"
    );
}

#[cfg(test)]
#[tokio::test]
async fn test_zero_count_without_request() {
    // nothing listens on port 9, an actual request would fail
    let reader = DogApiReader::new("http://127.0.0.1:9/api", None, Duration::from_secs(1)).unwrap();
    assert_eq!(reader.fetch_image_urls(0).await.unwrap(), Vec::<String>::new());
    assert_eq!(
        reader.fetch_image_urls(2).await.unwrap_err().kind(),
        ErrorKind::Fetch
    );
}
