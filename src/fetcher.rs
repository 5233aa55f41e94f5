use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tracing::debug;

use crate::config::HTTP_TIMEOUT_SECS;
use crate::error::Result;
use crate::types::{Event, Logo};

/// Issues scoreboard requests and best-effort logo prefetches. Requests to a
/// URL already in flight are skipped rather than duplicated; fast polling
/// must not stack redundant requests on a slow endpoint.
pub struct Fetcher {
    client: reqwest::Client,
    in_flight: DashSet<String>,
    prefetching: DashSet<String>,
    logo_dir: PathBuf,
}

impl Fetcher {
    pub fn new(logo_dir: PathBuf) -> Result<Arc<Self>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Arc::new(Self {
            client,
            in_flight: DashSet::new(),
            prefetching: DashSet::new(),
            logo_dir,
        }))
    }

    /// Fetch one scoreboard body. `Ok(None)` means the URL is already in
    /// flight and this cycle should skip it. No retries; a failed cycle
    /// leaves existing store data in place.
    pub async fn fetch_scoreboard(&self, url: &str) -> Result<Option<String>> {
        if !self.in_flight.insert(url.to_string()) {
            debug!(url, "request already in flight, skipping");
            return Ok(None);
        }
        let result = self.fetch_body(url).await;
        self.in_flight.remove(url);
        result.map(Some)
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }

    /// Schedule background downloads for every logo in the batch that is not
    /// on disk yet, deduplicated by logo id.
    pub fn prefetch_event_logos(self: &Arc<Self>, events: &[Event]) {
        for event in events {
            for logo in event.home_logo.iter().chain(event.away_logo.iter()) {
                self.prefetch_logo(logo);
            }
        }
    }

    fn prefetch_logo(self: &Arc<Self>, logo: &Logo) {
        let path = self.logo_dir.join(format!("{}.png", logo.id));
        if path.exists() {
            return;
        }
        if !self.prefetching.insert(logo.id.clone()) {
            return;
        }
        let this = Arc::clone(self);
        let logo = logo.clone();
        tokio::spawn(async move {
            if let Err(e) = this.download_logo(&logo, &path).await {
                debug!(logo_id = %logo.id, "logo prefetch failed: {e}");
            }
            this.prefetching.remove(&logo.id);
        });
    }

    async fn download_logo(&self, logo: &Logo, path: &std::path::Path) -> Result<()> {
        let bytes = self
            .client
            .get(&logo.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}
