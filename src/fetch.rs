use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::error::FetchError;
use crate::html::{self, Element};
use crate::settings::Settings;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 500;

/// HTTP client for documentation pages. Cheap to clone.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch a page and parse it into an element tree.
    pub async fn fetch_document(&self, url: &Url) -> Result<Element, FetchError> {
        let body = self.fetch_text(url).await?;
        Ok(html::parse(&body))
    }

    /// Fetch a page body, retrying rate limits and transient server errors
    /// with exponential backoff.
    pub async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Err(FetchError::Status { status, .. })
                    if is_transient(status) && attempt < MAX_RETRIES =>
                {
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        "HTTP {} from {} (attempt {}/{}), backing off {:.1}s",
                        status,
                        url,
                        attempt + 1,
                        MAX_RETRIES,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(transport)?;
        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
    )
}
