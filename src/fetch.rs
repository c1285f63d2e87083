use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::FetchError;

/// The uncached half of a round: one direct request to the origin.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<(), FetchError>;
}

/// Plain `GET` over reqwest. The fetch counts as complete once the status
/// line and headers arrive; the body is not read and any status code,
/// including 4xx/5xx, is a completed fetch.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<(), FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        tracing::trace!(%url, status = response.status().as_u16(), "fetched");
        Ok(())
    }
}
