use crate::error::Result;
use async_trait::async_trait;
use reqwest::{Client, Url};

/// Something that can fetch the body behind a URL.
///
/// A non-2xx response must be reported as an error. Timeouts, proxies and
/// connection pooling are the implementation's business.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

#[async_trait]
impl Transport for Client {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.get(url.clone()).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
