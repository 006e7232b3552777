//! Site acquisition engine.
//!
//! [`Crawler`] fetches the seed page, selects the working set of topical
//! links from it, and fetches every selected site over a bounded worker
//! pool. Results come back in slot order so downstream stages stay
//! deterministic regardless of completion order.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use topicbase_shared::{CrawlSettings, Result, TopicBaseError};

use crate::links::extract_candidates;

// ---------------------------------------------------------------------------
// Reachability
// ---------------------------------------------------------------------------

/// Outcome of a reachability probe.
///
/// Only HTTP 404 marks a candidate [`Gone`](Reachability::Gone); any other
/// response, server errors included, counts as reachable. Transport
/// failures are not coerced into either state and surface as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Gone,
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// HTTP client wrapper for seed fetch, candidate probing, and the bounded
/// concurrent fetch of the working set.
pub struct Crawler {
    settings: CrawlSettings,
    client: Client,
}

impl Crawler {
    /// Create a new crawler from runtime settings.
    pub fn new(settings: CrawlSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| TopicBaseError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { settings, client })
    }

    /// Fetch a page body. Any non-success status is an error; there is no
    /// retry, the caller decides whether the site is dropped.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        fetch_url(&self.client, url).await
    }

    /// Probe a candidate URL for reachability.
    pub async fn probe(&self, url: &str) -> Result<Reachability> {
        probe_url(&self.client, url).await
    }

    /// Select the working set of site URLs.
    ///
    /// The seed is always first. Candidates from the seed page are probed
    /// in document order, concurrently in batches but collected in order,
    /// until the set reaches `site_count` or candidates run out. Gone and
    /// unprobeable candidates are excluded and logged.
    #[instrument(skip_all, fields(seed = %seed_url))]
    pub async fn select_sites(&self, seed_url: &str, seed_html: &str) -> Vec<String> {
        let target = self.settings.site_count;
        let mut selected = vec![seed_url.to_string()];
        if selected.len() >= target {
            return selected;
        }

        let candidates =
            extract_candidates(seed_html, &self.settings.keywords, &self.settings.excluded);
        info!(
            candidates = candidates.len(),
            target, "probing candidate links"
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut remaining = candidates.into_iter();

        'selection: loop {
            let batch: Vec<String> = remaining.by_ref().take(self.settings.concurrency).collect();
            if batch.is_empty() {
                break;
            }

            let mut handles = Vec::with_capacity(batch.len());
            for url in batch {
                let client = self.client.clone();
                let sem = semaphore.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = sem.acquire().await.expect("semaphore closed");
                    let outcome = probe_url(&client, &url).await;
                    (url, outcome)
                }));
            }

            for handle in handles {
                let (url, outcome) = match handle.await {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "probe task failed");
                        continue;
                    }
                };

                match outcome {
                    Ok(Reachability::Reachable) => {
                        selected.push(url);
                        if selected.len() >= target {
                            break 'selection;
                        }
                    }
                    Ok(Reachability::Gone) => {
                        debug!(%url, "candidate gone, excluding");
                    }
                    Err(e) => {
                        warn!(%url, error = %e, "candidate probe failed, excluding");
                    }
                }
            }
        }

        info!(selected = selected.len(), target, "site selection complete");
        selected
    }

    /// Fetch every URL of the working set, bounded by the configured
    /// concurrency. Returns one result per input slot, in input order.
    #[instrument(skip_all, fields(sites = urls.len()))]
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<Result<String>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));

        let mut handles = Vec::with_capacity(urls.len());
        for url in urls {
            let client = self.client.clone();
            let sem = semaphore.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                fetch_url(&client, &url).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    results.push(Err(TopicBaseError::transport(format!(
                        "fetch task failed: {e}"
                    ))));
                }
            }
        }
        results
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// GET a page body. 404 becomes [`TopicBaseError::NotFound`], other
/// non-success statuses and transport failures become `Transport`, and an
/// empty body becomes `Parse`.
async fn fetch_url(client: &Client, url: &str) -> Result<String> {
    debug!(%url, "fetching page");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TopicBaseError::transport(format!("{url}: {e}")))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(TopicBaseError::NotFound {
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(TopicBaseError::transport(format!("{url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| TopicBaseError::transport(format!("{url}: body read failed: {e}")))?;
    if body.trim().is_empty() {
        return Err(TopicBaseError::parse(format!("{url}: empty body")));
    }
    Ok(body)
}

/// GET a candidate URL and map its status to [`Reachability`].
async fn probe_url(client: &Client, url: &str) -> Result<Reachability> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TopicBaseError::transport(format!("{url}: {e}")))?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(Reachability::Gone);
    }
    Ok(Reachability::Reachable)
}
