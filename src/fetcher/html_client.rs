use anyhow::{Result, anyhow};
use reqwest::{Client, Url};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::config::ScrapingConfig;

/// Browser-like user agent; the demo site serves plain HTML to it
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:136.0) Gecko/20100101 Firefox/136.0";

/// Longest pause between two attempts at the same page
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// HTTP client shared by the page scrapers: pacing, retries and backoff
pub struct HtmlClient {
    client: Client,
    delay_between_requests_ms: u64,
    max_retries: usize,
}

impl HtmlClient {
    pub fn new(scraping: &ScrapingConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(scraping.timeout_seconds.max(1)))
            .build()?;

        Ok(HtmlClient {
            client,
            delay_between_requests_ms: scraping.delay_between_requests_ms,
            max_retries: scraping.max_retries.max(1),
        })
    }

    /// Fetch HTML page with retry logic
    pub async fn fetch_page_with_retry(&self, url: &str) -> Result<String> {
        let mut attempts = 0;

        loop {
            match self.fetch_page(url).await {
                Ok(html) => return Ok(html),
                Err(e) => {
                    attempts += 1;
                    if attempts >= self.max_retries {
                        return Err(e);
                    }

                    // Exponential backoff with jitter
                    let delay = Duration::from_millis(backoff_delay_ms(
                        attempts,
                        rand::random::<u64>() % 1000,
                    ));
                    warn!(
                        "Attempt {} failed for {}, retrying in {:?}: {}",
                        attempts, url, delay, e
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Rate limiting between pages
    pub async fn pause(&self) {
        let delay = Duration::from_millis(
            self.delay_between_requests_ms
                .saturating_add(rand::random::<u64>() % 500),
        );
        sleep(delay).await;
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }

        Ok(response.text().await?)
    }
}

/// `1s * 2^attempts` plus jitter, capped at [`MAX_BACKOFF_MS`]
pub fn backoff_delay_ms(attempts: usize, jitter_ms: u64) -> u64 {
    let exponent = u32::try_from(attempts).unwrap_or(u32::MAX);
    1000_u64
        .saturating_mul(2_u64.saturating_pow(exponent))
        .saturating_add(jitter_ms)
        .min(MAX_BACKOFF_MS)
}

/// Append `param=page` to `base` for every page after the first
pub fn paginate(base: &str, param: &str, page: usize) -> String {
    if page <= 1 {
        return base.to_string();
    }

    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base, separator, param, page)
}

/// Resolve a link found on `page_url`, keeping it as is when either side
/// does not parse
pub fn resolve_link(page_url: &str, href: &str) -> String {
    match Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}
