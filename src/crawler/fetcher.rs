//! HTTP page fetcher
//!
//! Issues the per-job GET with a bounded timeout and a fixed user agent.
//! The response must carry exactly HTTP 200; anything else is a terminal
//! failure for the owning job.

use std::time::Duration;

use reqwest::Client;

use crate::error::FetchError;

/// Page fetcher with a configured timeout and fixed user agent
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Build the fetcher's HTTP client
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the client cannot be created.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch a page's HTML
    ///
    /// # Errors
    ///
    /// - `FetchError::Status` for any non-200 response
    /// - `FetchError::Timeout` when the request times out
    /// - `FetchError::Http` for other transport failures
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!(url = %url, "fetching page");

        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await.map_err(classify)?;
        Ok(body)
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e)
    }
}
