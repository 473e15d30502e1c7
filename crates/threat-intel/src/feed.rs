//! Phishing-URL feed
//!
//! Holds the OpenPhish feed in memory as a lowercased URL set and refreshes
//! it lazily: the first query after the refresh interval elapses re-fetches
//! the feed. Readers heavily outnumber refreshes, so the set is published
//! copy-on-refresh behind an RwLock, and a separate async mutex guarantees a
//! stale window triggers exactly one fetch.

use ahash::AHashSet;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Sub-record for the feed source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedReport {
    pub success: bool,
    pub listed: bool,
    pub feed_size: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// In-memory phishing-URL feed with lazy refresh
pub struct PhishingFeed {
    feed_url: String,
    refresh_interval: Duration,
    fetch_timeout: Duration,
    client: reqwest::Client,
    entries: RwLock<Arc<AHashSet<String>>>,
    last_refresh: RwLock<Option<Instant>>,
    last_updated: RwLock<Option<DateTime<Utc>>>,
    refresh_guard: tokio::sync::Mutex<()>,
}

impl PhishingFeed {
    pub fn new(feed_url: String, refresh_interval: Duration, fetch_timeout: Duration) -> Self {
        Self {
            feed_url,
            refresh_interval,
            fetch_timeout,
            client: reqwest::Client::new(),
            entries: RwLock::new(Arc::new(AHashSet::new())),
            last_refresh: RwLock::new(None),
            last_updated: RwLock::new(None),
            refresh_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Check feed membership of the (lowercased, trimmed) URL
    pub async fn check(&self, url: &str) -> FeedReport {
        self.refresh_if_stale().await;

        let normalized = url.trim().to_lowercase();
        let entries = self.entries.read().clone();

        FeedReport {
            success: true,
            listed: entries.contains(&normalized),
            feed_size: entries.len(),
            last_updated: *self.last_updated.read(),
            error: None,
        }
    }

    /// Number of URLs currently held
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Inject feed entries directly, bypassing the fetch. Test seam, also
    /// used by operators to preload a snapshot at startup.
    pub fn load_entries<I: IntoIterator<Item = String>>(&self, urls: I) {
        let set: AHashSet<String> = urls
            .into_iter()
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty())
            .collect();
        *self.entries.write() = Arc::new(set);
        *self.last_refresh.write() = Some(Instant::now());
        *self.last_updated.write() = Some(Utc::now());
    }

    fn is_stale(&self) -> bool {
        match *self.last_refresh.read() {
            Some(at) => at.elapsed() >= self.refresh_interval,
            None => true,
        }
    }

    async fn refresh_if_stale(&self) {
        if !self.is_stale() {
            return;
        }

        // Serialize refreshes; whoever loses the race re-checks staleness so
        // one stale window produces exactly one fetch.
        let _guard = self.refresh_guard.lock().await;
        if !self.is_stale() {
            return;
        }

        match self.fetch().await {
            Ok(set) => {
                let count = set.len();
                *self.entries.write() = Arc::new(set);
                *self.last_updated.write() = Some(Utc::now());
                info!(count, "phishing feed refreshed");
            }
            Err(e) => {
                warn!("phishing feed refresh failed: {e}");
            }
        }

        // Stamp the attempt either way; a failing feed is retried next
        // interval instead of on every request.
        *self.last_refresh.write() = Some(Instant::now());
    }

    async fn fetch(&self) -> Result<AHashSet<String>, reqwest::Error> {
        let response = self
            .client
            .get(&self.feed_url)
            .timeout(self.fetch_timeout)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        Ok(body
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> PhishingFeed {
        PhishingFeed::new(
            "http://127.0.0.1:9/feed.txt".to_string(), // port 9: always refused
            Duration::from_secs(900),
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn membership_is_case_insensitive_and_trimmed() {
        let f = feed();
        f.load_entries(vec!["http://evil.example/login".to_string()]);

        let hit = f.check("  HTTP://EVIL.EXAMPLE/login ").await;
        assert!(hit.listed);
        assert_eq!(hit.feed_size, 1);

        let miss = f.check("http://clean.example/").await;
        assert!(!miss.listed);
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_empty_set() {
        let f = feed();
        let report = f.check("http://anything.example/").await;
        assert!(report.success);
        assert!(!report.listed);
        assert_eq!(report.feed_size, 0);
    }

    #[tokio::test]
    async fn fresh_window_skips_refetch() {
        let f = feed();
        f.load_entries(vec!["http://evil.example/".to_string()]);
        // A fetch against the refused port would empty nothing; entries
        // surviving proves the stale check short-circuited.
        let report = f.check("http://evil.example/").await;
        assert!(report.listed);
        assert_eq!(f.len(), 1);
    }

    #[tokio::test]
    async fn refresh_triggers_once_per_stale_window() {
        let f = PhishingFeed::new(
            "http://127.0.0.1:9/feed.txt".to_string(),
            Duration::from_secs(900),
            Duration::from_millis(50),
        );
        // Concurrent queries against a never-refreshed feed: the guard lets
        // one fetch attempt through, after which the window is stamped.
        let (a, b) = tokio::join!(f.check("http://x.example/"), f.check("http://y.example/"));
        assert!(a.success && b.success);
        assert!(!f.is_stale());
    }
}
