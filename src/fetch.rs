/// Rate-limited page fetching against the listing origin.
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::ScrapeError;

/// HTTP fetcher shared by every page type.
///
/// Inserts a fixed short delay before each request to stay under the
/// origin's rate-sensitivity threshold, and retries a 503 exactly once
/// after a longer delay before propagating failure.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    fetch_delay: Duration,
    retry_delay: Duration,
}

impl PageFetcher {
    pub fn new(config: &HttpConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            fetch_delay: Duration::from_millis(config.fetch_delay_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Fetch a page body.
    pub async fn get(&self, url: &str) -> Result<String, ScrapeError> {
        sleep(self.fetch_delay).await;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::from_request(url, e))?;

        let response = if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            warn!("503 from {}, retrying once after backoff", url);
            sleep(self.retry_delay).await;
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| ScrapeError::from_request(url, e))?
        } else {
            response
        };

        if !response.status().is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ScrapeError::from_request(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_fetcher_construction() {
        let config = Config::default();
        let fetcher = PageFetcher::new(&config.http);
        assert_eq!(fetcher.fetch_delay, Duration::from_millis(400));
        assert_eq!(fetcher.retry_delay, Duration::from_millis(1000));
    }
}
