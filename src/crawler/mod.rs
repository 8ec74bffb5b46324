//! Crawl driver: walks listing pages through their pagination chain and
//! resolves every discovered detail page into a record.
//!
//! Fetching sits behind the [`Fetch`] trait so the loop can run against a
//! stub in tests. The extraction core stays pure; everything network-shaped
//! lives here, including the politeness delay between requests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use scraper::Html;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::extract::{resolve_listing, DetailPage};
use crate::frontier::{build_frontier, Frontier};
use crate::models::ListingRecord;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Supplies page bodies to the crawler; the core never performs network
/// calls itself.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String>;
}

/// HTTP fetcher with Spanish-market request headers.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("es-ES,es;q=0.9"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!("Fetching URL: {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        if !response.status().is_success() {
            warn!("{url} returned status: {}", response.status());
            anyhow::bail!("Failed to fetch {url}: {}", response.status());
        }

        response.text().await.context("Failed to read response body")
    }
}

/// Single-site, single-process crawl loop.
pub struct Crawler<F: Fetch> {
    fetcher: F,
    delay: Duration,
    max_listing_pages: usize,
}

impl<F: Fetch> Crawler<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            delay: Duration::from_millis(500),
            max_listing_pages: 50,
        }
    }

    pub fn with_limits(mut self, delay: Duration, max_listing_pages: usize) -> Self {
        self.delay = delay;
        self.max_listing_pages = max_listing_pages;
        self
    }

    /// Walk the pagination chain from `start`, visiting each detail page
    /// once per run. A failed detail fetch is logged and skipped; a failed
    /// listing-page fetch ends the pagination chain but keeps the records
    /// already collected from earlier pages.
    pub async fn run(&self, start: Url) -> Result<Vec<ListingRecord>> {
        let mut records = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut next = Some(start);
        let mut pages = 0;

        while let Some(listing_url) = next.take() {
            if pages >= self.max_listing_pages {
                info!("Listing page limit reached, stopping pagination");
                break;
            }
            pages += 1;

            let body = match self.fetcher.fetch(&listing_url).await {
                Ok(body) => body,
                Err(err) => {
                    warn!("Stopping pagination, listing page {listing_url} failed: {err:#}");
                    break;
                }
            };
            let frontier = classify(&body, &listing_url);
            info!(
                "Listing page {pages}: {} detail links, next page: {}",
                frontier.detail_urls.len(),
                frontier.next_page.as_deref().unwrap_or("none")
            );

            for detail_url in &frontier.detail_urls {
                if !visited.insert(detail_url.clone()) {
                    continue;
                }
                let Ok(url) = Url::parse(detail_url) else {
                    continue;
                };

                tokio::time::sleep(self.delay).await;
                match self.fetcher.fetch(&url).await {
                    Ok(detail_body) => match resolve(&detail_body, url) {
                        Some(record) => records.push(record),
                        None => debug!("Rejected inadmissible page: {detail_url}"),
                    },
                    Err(err) => warn!("Skipping detail page {detail_url}: {err:#}"),
                }
            }

            next = match frontier.next_page.as_deref().map(Url::parse) {
                Some(Ok(url)) => Some(url),
                Some(Err(err)) => {
                    warn!("Ignoring unparsable next-page URL: {err}");
                    None
                }
                None => None,
            };
            if next.is_some() {
                tokio::time::sleep(self.delay).await;
            }
        }

        Ok(records)
    }
}

// Parsed documents are not Send, so classification and resolution happen in
// sync helpers that drop the tree before the next await point.
fn classify(body: &str, url: &Url) -> Frontier {
    let html = Html::parse_document(body);
    build_frontier(&html, url)
}

fn resolve(body: &str, url: Url) -> Option<ListingRecord> {
    let page = DetailPage::new(body, url);
    resolve_listing(&page)
}
