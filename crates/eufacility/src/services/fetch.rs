//! HTTP retrieval of remote sources.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{FacilityError, Result};

use super::provider::RemoteFetch;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Blocking HTTP client with a bounded timeout.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FacilityError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl RemoteFetch for HttpFetcher {
    fn is_available(&self, url: &str) -> Result<bool> {
        let response = self
            .client
            .head(url)
            .send()
            .map_err(|e| FacilityError::Service(format!("HEAD {} failed: {}", url, e)))?;
        Ok(response.status().is_success())
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FacilityError::Service(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(FacilityError::Service(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| FacilityError::Service(format!("Failed to read {}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}
