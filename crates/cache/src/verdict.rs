//! Verdict cache layer
//!
//! Key schema and TTL policy over the raw cache. Verdict keys hash the
//! lowercased, trimmed URL; per-source threat-intel records hash their
//! identifier under a source-scoped prefix. The TTL is a pure function of
//! the stored verdict: critical threats never expire, positives live a week,
//! negatives a day.

use crate::{hash16, Cache};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Verdict-driven TTL policy
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    pub positive: Duration,
    pub negative: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            positive: Duration::from_secs(604_800),
            negative: Duration::from_secs(86_400),
        }
    }
}

/// TTL for a stored verdict. Pure: the same (score, risk level) always maps
/// to the same TTL. `None` means no expiry.
pub fn ttl_for_verdict(policy: &TtlPolicy, threat_score: u32, risk_level: &str) -> Option<Duration> {
    if risk_level == "critical" || threat_score >= 90 {
        None
    } else if threat_score >= 60 {
        Some(policy.positive)
    } else {
        Some(policy.negative)
    }
}

/// Cache wrapper speaking in verdicts and per-source records
pub struct VerdictCache {
    cache: Arc<Cache>,
    policy: TtlPolicy,
}

impl VerdictCache {
    pub fn new(cache: Arc<Cache>, policy: TtlPolicy) -> Self {
        Self { cache, policy }
    }

    /// Cached verdict for a URL, if present
    pub async fn get_url_verdict(&self, url: &str) -> Option<Value> {
        self.cache.get(&url_key(url)).await
    }

    /// Store a verdict under the TTL dictated by its own content
    pub async fn store_url_verdict(&self, url: &str, verdict: &Value, threat_score: u32, risk_level: &str) {
        let ttl = ttl_for_verdict(&self.policy, threat_score, risk_level);
        if ttl.is_none() {
            info!(url, threat_score, "caching critical verdict without expiry");
        }
        self.cache.set(&url_key(url), verdict, ttl).await;
    }

    /// Cached per-source threat-intel record
    pub async fn get_source_record(&self, source: &str, identifier: &str) -> Option<Value> {
        self.cache.get(&source_key(source, identifier)).await
    }

    /// Store a per-source record; defaults to the negative TTL
    pub async fn store_source_record(
        &self,
        source: &str,
        identifier: &str,
        record: &Value,
        ttl: Option<Duration>,
    ) {
        let ttl = ttl.or(Some(self.policy.negative));
        self.cache.set(&source_key(source, identifier), record, ttl).await;
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }
}

fn url_key(url: &str) -> String {
    format!("url_analysis:{}", hash16(&url.trim().to_lowercase()))
}

fn source_key(source: &str, identifier: &str) -> String {
    format!("threatintel:{}:{}", source, hash16(identifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> TtlPolicy {
        TtlPolicy::default()
    }

    #[test]
    fn ttl_policy_is_pure_and_tiered() {
        let p = policy();

        // Critical by level or by score: no expiry
        assert_eq!(ttl_for_verdict(&p, 95, "critical"), None);
        assert_eq!(ttl_for_verdict(&p, 92, "dangerous"), None);
        // Positive below the critical bar: 7 days
        assert_eq!(ttl_for_verdict(&p, 72, "dangerous"), Some(p.positive));
        assert_eq!(ttl_for_verdict(&p, 60, "suspicious"), Some(p.positive));
        // Negative: 24 hours
        assert_eq!(ttl_for_verdict(&p, 59, "suspicious"), Some(p.negative));
        assert_eq!(ttl_for_verdict(&p, 5, "safe"), Some(p.negative));

        // Same verdict, same TTL
        assert_eq!(ttl_for_verdict(&p, 72, "dangerous"), ttl_for_verdict(&p, 72, "dangerous"));
    }

    #[test]
    fn url_keys_normalise_case_and_whitespace() {
        assert_eq!(url_key("  HTTPS://Example.COM/a "), url_key("https://example.com/a"));
        assert_ne!(url_key("https://example.com/a"), url_key("https://example.com/b"));
        assert!(url_key("https://example.com/a").starts_with("url_analysis:"));
    }

    #[test]
    fn source_keys_are_scoped_per_source() {
        let a = source_key("virustotal", "https://example.com/");
        let b = source_key("abuseipdb", "https://example.com/");
        assert_ne!(a, b);
        assert!(a.starts_with("threatintel:virustotal:"));
    }

    #[tokio::test]
    async fn verdict_roundtrip_through_memory_backend() {
        let verdicts = VerdictCache::new(Arc::new(Cache::in_memory()), policy());
        let verdict = json!({"threat_score": 72, "risk_level": "dangerous"});

        verdicts.store_url_verdict("https://evil.example/x", &verdict, 72, "dangerous").await;
        let cached = verdicts.get_url_verdict("https://evil.example/x").await;
        assert_eq!(cached, Some(verdict));

        assert!(verdicts.get_url_verdict("https://other.example/").await.is_none());
    }

    #[tokio::test]
    async fn source_records_roundtrip() {
        let verdicts = VerdictCache::new(Arc::new(Cache::in_memory()), policy());
        let record = json!({"success": true, "malicious": 7});

        verdicts
            .store_source_record("virustotal", "https://evil.example/", &record, None)
            .await;
        let cached = verdicts.get_source_record("virustotal", "https://evil.example/").await;
        assert_eq!(cached, Some(record));
    }
}
