//! HTTP client for the country boundary dataset.
//!
//! The dataset is a single GeoJSON document fetched once per session:
//! - Connection/transport errors retry with exponential backoff
//! - 429 responses back off and retry
//! - Any other failure is logged and treated as "boundaries unavailable"

use log::{info, warn};
use reqwest::Client;
use std::time::{Duration, Instant};

use crate::boundaries::{parse_boundaries_bytes, BoundaryCollection, DEFAULT_BOUNDARIES_URL};
use crate::error::{CountryMatchError, Result};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Wait before retry `retries` after a 429 response.
fn rate_limit_backoff(retries: u32) -> Duration {
    Duration::from_millis(500 * (1 << retries.min(3)))
}

/// Wait before retry `retries` after a transport error.
fn transport_backoff(retries: u32) -> Duration {
    Duration::from_millis(200 * (1 << retries.min(5)))
}

/// Fetches and parses the boundary dataset.
pub struct BoundaryFetcher {
    client: Client,
    url: String,
    max_retries: u32,
}

impl BoundaryFetcher {
    /// Create a fetcher for the default world boundaries dataset.
    pub fn new() -> Result<Self> {
        Self::with_url(DEFAULT_BOUNDARIES_URL)
    }

    /// Create a fetcher for a specific dataset URL.
    pub fn with_url(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| CountryMatchError::HttpError {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
            max_retries: MAX_RETRIES,
        })
    }

    /// Override the number of retries after the first attempt.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and parse the dataset.
    pub async fn fetch(&self) -> Result<BoundaryCollection> {
        let start = Instant::now();
        let bytes = self.fetch_bytes().await?;
        let download_elapsed = start.elapsed();

        let parse_start = Instant::now();
        let collection = parse_boundaries_bytes(&bytes)?;

        info!(
            "[BoundaryFetcher] {} features from {:.1}KB: download={:?} parse={:?}",
            collection.len(),
            bytes.len() as f64 / 1024.0,
            download_elapsed,
            parse_start.elapsed()
        );

        Ok(collection)
    }

    /// Fetch the dataset, degrading to an empty collection on any failure.
    pub async fn fetch_or_empty(&self) -> BoundaryCollection {
        match self.fetch().await {
            Ok(collection) => collection,
            Err(e) => {
                warn!("[BoundaryFetcher] {}; continuing without boundaries", e);
                BoundaryCollection::empty()
            }
        }
    }

    async fn fetch_bytes(&self) -> Result<Vec<u8>> {
        let mut retries = 0;

        loop {
            let response = self.client.get(&self.url).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS && retries < self.max_retries {
                        retries += 1;
                        let wait = rate_limit_backoff(retries);
                        warn!(
                            "[BoundaryFetcher] 429 Too Many Requests, retry {} with {:?} backoff",
                            retries, wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(CountryMatchError::HttpError {
                            message: format!("GET {} failed", self.url),
                            status_code: Some(status.as_u16()),
                        });
                    }

                    let bytes = resp.bytes().await.map_err(|e| CountryMatchError::HttpError {
                        message: format!("Body download error: {}", e),
                        status_code: None,
                    })?;
                    return Ok(bytes.to_vec());
                }
                Err(e) => {
                    if retries >= self.max_retries {
                        return Err(CountryMatchError::HttpError {
                            message: format!("Request error: {}", e),
                            status_code: None,
                        });
                    }

                    retries += 1;
                    let wait = transport_backoff(retries);
                    warn!(
                        "[BoundaryFetcher] Error: {}, retry {} after {:?}",
                        e, retries, wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Synchronous wrapper for FFI - runs the fetch on a tokio runtime.
/// Any failure yields an empty collection.
#[cfg(feature = "ffi")]
pub fn fetch_boundaries_sync(url: &str) -> BoundaryCollection {
    use tokio::runtime::Builder;

    info!("[FFI] fetch_boundaries_sync called for {}", url);

    let rt = match Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            warn!("Failed to create tokio runtime: {}", e);
            return BoundaryCollection::empty();
        }
    };

    let fetcher = match BoundaryFetcher::with_url(url) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create fetcher: {}", e);
            return BoundaryCollection::empty();
        }
    };

    rt.block_on(fetcher.fetch_or_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        let fetcher = BoundaryFetcher::new().unwrap();
        assert_eq!(fetcher.url(), DEFAULT_BOUNDARIES_URL);
    }

    #[test]
    fn test_backoff_is_bounded() {
        assert_eq!(transport_backoff(1), Duration::from_millis(400));
        assert_eq!(rate_limit_backoff(1), Duration::from_millis(1000));

        // Large retry budgets must not overflow the shift
        assert_eq!(transport_backoff(64), Duration::from_millis(6400));
        assert_eq!(transport_backoff(u32::MAX), transport_backoff(5));
        assert_eq!(rate_limit_backoff(u32::MAX), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_unreachable_host_degrades_to_empty() {
        // Nothing listens on port 9 locally; connection is refused immediately
        let fetcher = BoundaryFetcher::with_url("http://127.0.0.1:9/countries.geojson")
            .unwrap()
            .max_retries(0);

        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, CountryMatchError::HttpError { status_code: None, .. }));

        let collection = fetcher.fetch_or_empty().await;
        assert!(collection.is_empty());
    }
}
