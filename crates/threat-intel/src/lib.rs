//! Threat-intelligence aggregation
//!
//! Orchestrates three independent sources — the OpenPhish feed, VirusTotal
//! URL reputation, and AbuseIPDB host reputation — into one clamped 0-100
//! score with per-source sub-records and ranked reason strings. Every source
//! degrades silently; a failed or rate-limited source simply contributes
//! nothing.

pub mod feed;
pub mod rate_limit;
pub mod sources;

use phishlens_config::IntelSettings;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use feed::{FeedReport, PhishingFeed};
pub use rate_limit::SlidingWindow;
pub use sources::{AbuseIpdbClient, AbuseIpdbReport, VirusTotalClient, VirusTotalReport};

/// Aggregated threat-intelligence verdict for one URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreatIntelReport {
    /// Accumulated source score, clamped to 100
    pub score: u32,
    /// Strong per-source confirmations, feeds the confidence formula
    pub hits: u32,
    pub reasons: Vec<String>,
    pub feed: FeedReport,
    pub virustotal: VirusTotalReport,
    pub abuseipdb: AbuseIpdbReport,
}

/// Fans a URL out to all reputation sources and fuses the sub-records
pub struct ThreatIntelAggregator {
    feed: PhishingFeed,
    virustotal: VirusTotalClient,
    abuseipdb: AbuseIpdbClient,
}

impl ThreatIntelAggregator {
    pub fn new(settings: &IntelSettings) -> Self {
        Self {
            feed: PhishingFeed::new(
                settings.phishing_feed_url.clone(),
                settings.feed_refresh_interval(),
                settings.feed_fetch_timeout(),
            ),
            virustotal: VirusTotalClient::new(
                settings.virustotal_api_key.clone(),
                settings.virustotal_rate_limit,
                settings.request_timeout(),
            ),
            abuseipdb: AbuseIpdbClient::new(
                settings.abuseipdb_api_key.clone(),
                settings.abuseipdb_rate_limit,
                settings.request_timeout(),
            ),
        }
    }

    /// Check a URL against every source
    pub async fn check_url(&self, url: &str) -> ThreatIntelReport {
        let mut report = ThreatIntelReport::default();

        // Feed first: no credential, no external API budget
        report.feed = self.feed.check(url).await;
        if report.feed.listed {
            report.hits += 1;
            report.score += 40;
            report
                .reasons
                .push("Listed in OpenPhish feed (confirmed phishing)".to_string());
        }

        report.virustotal = self.virustotal.check_url(url).await;
        if report.virustotal.success {
            let malicious = report.virustotal.malicious;
            if malicious >= 5 {
                report.hits += 1;
                report.score += 35;
                report
                    .reasons
                    .push(format!("VirusTotal: {malicious} vendors flagged as malicious"));
            } else if malicious >= 2 {
                report.score += 20;
                report
                    .reasons
                    .push(format!("VirusTotal: {malicious} vendors flagged (suspicious)"));
            }
        }

        if let Some(host) = url::Url::parse(url).ok().and_then(|u| u.host_str().map(String::from)) {
            report.abuseipdb = self.abuseipdb.check_host(&host).await;
            if report.abuseipdb.success {
                let confidence = report.abuseipdb.abuse_confidence;
                if confidence >= 75 {
                    report.hits += 1;
                    report.score += 25;
                    report
                        .reasons
                        .push(format!("AbuseIPDB: {confidence}% abuse confidence"));
                } else if confidence >= 50 {
                    report.score += 15;
                    report
                        .reasons
                        .push(format!("AbuseIPDB: Moderate risk ({confidence}%)"));
                }
            }
        } else {
            report.abuseipdb = AbuseIpdbReport {
                error: Some("Could not extract host".to_string()),
                ..AbuseIpdbReport::default()
            };
        }

        report.score = report.score.min(100);

        debug!(url, score = report.score, hits = report.hits, "threat intel aggregate");

        report
    }

    /// Direct access to the feed, for preloading and stats
    pub fn feed(&self) -> &PhishingFeed {
        &self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phishlens_config::Settings;

    fn aggregator() -> ThreatIntelAggregator {
        let mut settings = Settings::default();
        // Unroutable feed endpoint: sources degrade, nothing leaves the host
        settings.intel.phishing_feed_url = "http://127.0.0.1:9/feed.txt".to_string();
        settings.intel.feed_fetch_timeout_secs = 1;
        ThreatIntelAggregator::new(&settings.intel)
    }

    #[tokio::test]
    async fn feed_hit_scores_forty_and_counts_one_hit() {
        let agg = aggregator();
        agg.feed()
            .load_entries(vec!["http://paypal-secure-verify.tk/login".to_string()]);

        let report = agg.check_url("http://paypal-secure-verify.tk/login").await;
        assert_eq!(report.score, 40);
        assert_eq!(report.hits, 1);
        assert_eq!(
            report.reasons,
            vec!["Listed in OpenPhish feed (confirmed phishing)".to_string()]
        );
        assert!(report.feed.listed);
    }

    #[tokio::test]
    async fn unconfigured_sources_contribute_nothing() {
        let agg = aggregator();
        agg.feed().load_entries(Vec::<String>::new());

        let report = agg.check_url("https://example.com/").await;
        assert_eq!(report.score, 0);
        assert_eq!(report.hits, 0);
        assert!(report.reasons.is_empty());
        assert!(!report.virustotal.success);
        assert!(!report.abuseipdb.success);
    }
}
