//! External reputation sources
//!
//! VirusTotal (URL reputation, multi-vendor verdict counts) and AbuseIPDB
//! (host abuse confidence). Both are best-effort: missing credentials, rate
//! limiting, timeouts, and malformed responses all degrade to an
//! unsuccessful sub-record that contributes nothing to the aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::rate_limit::SlidingWindow;

const VT_URLS_ENDPOINT: &str = "https://www.virustotal.com/api/v3/urls";
const VT_ANALYSES_ENDPOINT: &str = "https://www.virustotal.com/api/v3/analyses";
const ABUSEIPDB_CHECK_ENDPOINT: &str = "https://api.abuseipdb.com/api/v2/check";

/// Sub-record for the VirusTotal source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VirusTotalReport {
    pub success: bool,
    pub malicious: u32,
    pub suspicious: u32,
    pub harmless: u32,
    pub undetected: u32,
    pub total_vendors: u32,
    pub error: Option<String>,
    pub wait_time_secs: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl VirusTotalReport {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    fn rate_limited(wait: Duration) -> Self {
        Self {
            error: Some("rate_limited".to_string()),
            wait_time_secs: Some(wait.as_secs_f64()),
            ..Self::default()
        }
    }
}

/// Sub-record for the AbuseIPDB source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbuseIpdbReport {
    pub success: bool,
    pub abuse_confidence: u32,
    pub total_reports: u32,
    pub whitelisted: bool,
    pub country: Option<String>,
    pub error: Option<String>,
    pub wait_time_secs: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl AbuseIpdbReport {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    fn rate_limited(wait: Duration) -> Self {
        Self {
            error: Some("rate_limited".to_string()),
            wait_time_secs: Some(wait.as_secs_f64()),
            ..Self::default()
        }
    }
}

/// VirusTotal URL-reputation client
pub struct VirusTotalClient {
    api_key: Option<String>,
    client: reqwest::Client,
    limiter: SlidingWindow,
    timeout: Duration,
}

impl VirusTotalClient {
    pub fn new(api_key: Option<String>, calls_per_minute: usize, timeout: Duration) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            limiter: SlidingWindow::new(calls_per_minute, Duration::from_secs(60)),
            timeout,
        }
    }

    /// Submit the URL and retrieve the vendor verdict counts
    pub async fn check_url(&self, url: &str) -> VirusTotalReport {
        let Some(api_key) = &self.api_key else {
            return VirusTotalReport::failure("API key not configured");
        };

        if let Err(wait) = self.limiter.try_acquire() {
            warn!(wait_secs = wait.as_secs_f64(), "VirusTotal rate limit hit");
            return VirusTotalReport::rate_limited(wait);
        }

        match self.check_url_inner(api_key, url).await {
            Ok(report) => report,
            Err(e) => {
                warn!("VirusTotal lookup failed: {e}");
                VirusTotalReport::failure(classify_error(&e))
            }
        }
    }

    async fn check_url_inner(
        &self,
        api_key: &str,
        url: &str,
    ) -> Result<VirusTotalReport, reqwest::Error> {
        let submit: serde_json::Value = self
            .client
            .post(VT_URLS_ENDPOINT)
            .header("x-apikey", api_key)
            .form(&[("url", url)])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(analysis_id) = submit["data"]["id"].as_str() else {
            return Ok(VirusTotalReport::failure("missing analysis id"));
        };

        let analysis: serde_json::Value = self
            .client
            .get(format!("{VT_ANALYSES_ENDPOINT}/{analysis_id}"))
            .header("x-apikey", api_key)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let stats = &analysis["data"]["attributes"]["stats"];
        let count = |key: &str| stats[key].as_u64().unwrap_or(0) as u32;
        let (malicious, suspicious, harmless, undetected) = (
            count("malicious"),
            count("suspicious"),
            count("harmless"),
            count("undetected"),
        );

        debug!(url, malicious, suspicious, "VirusTotal verdict counts");

        Ok(VirusTotalReport {
            success: true,
            malicious,
            suspicious,
            harmless,
            undetected,
            total_vendors: malicious + suspicious + harmless + undetected,
            error: None,
            wait_time_secs: None,
            timestamp: Some(Utc::now()),
        })
    }
}

/// AbuseIPDB host-reputation client
pub struct AbuseIpdbClient {
    api_key: Option<String>,
    client: reqwest::Client,
    limiter: SlidingWindow,
    timeout: Duration,
}

impl AbuseIpdbClient {
    pub fn new(api_key: Option<String>, calls_per_day: usize, timeout: Duration) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            limiter: SlidingWindow::new(calls_per_day, Duration::from_secs(86_400)),
            timeout,
        }
    }

    /// Fetch the abuse-confidence percentage for a host (IP or domain)
    pub async fn check_host(&self, host: &str) -> AbuseIpdbReport {
        let Some(api_key) = &self.api_key else {
            return AbuseIpdbReport::failure("API key not configured");
        };

        if let Err(wait) = self.limiter.try_acquire() {
            warn!(wait_secs = wait.as_secs_f64(), "AbuseIPDB rate limit hit");
            return AbuseIpdbReport::rate_limited(wait);
        }

        match self.check_host_inner(api_key, host).await {
            Ok(report) => report,
            Err(e) => {
                warn!("AbuseIPDB lookup failed: {e}");
                AbuseIpdbReport::failure(classify_error(&e))
            }
        }
    }

    async fn check_host_inner(
        &self,
        api_key: &str,
        host: &str,
    ) -> Result<AbuseIpdbReport, reqwest::Error> {
        let body: serde_json::Value = self
            .client
            .get(ABUSEIPDB_CHECK_ENDPOINT)
            .header("Key", api_key)
            .header("Accept", "application/json")
            .query(&[("ipAddress", host), ("maxAgeInDays", "90")])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let data = &body["data"];
        if data.is_null() {
            return Ok(AbuseIpdbReport::failure("empty response"));
        }

        Ok(AbuseIpdbReport {
            success: true,
            abuse_confidence: data["abuseConfidenceScore"].as_u64().unwrap_or(0) as u32,
            total_reports: data["totalReports"].as_u64().unwrap_or(0) as u32,
            whitelisted: data["isWhitelisted"].as_bool().unwrap_or(false),
            country: data["countryCode"].as_str().map(|s| s.to_string()),
            error: None,
            wait_time_secs: None,
            timestamp: Some(Utc::now()),
        })
    }
}

fn classify_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timeout".to_string()
    } else if let Some(status) = e.status() {
        format!("HTTP {status}")
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_fails_without_calling_out() {
        let vt = VirusTotalClient::new(None, 4, Duration::from_secs(3));
        let report = vt.check_url("https://example.com/").await;
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("API key not configured"));

        let abuse = AbuseIpdbClient::new(None, 1000, Duration::from_secs(3));
        let report = abuse.check_host("example.com").await;
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("API key not configured"));
    }

    #[tokio::test]
    async fn exhausted_budget_reports_rate_limited_with_wait() {
        let vt = VirusTotalClient::new(Some("k".to_string()), 0, Duration::from_secs(3));
        let report = vt.check_url("https://example.com/").await;
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("rate_limited"));
        assert!(report.wait_time_secs.is_some());
    }

    #[test]
    fn rate_limited_record_shape() {
        let report = AbuseIpdbReport::rate_limited(Duration::from_secs(30));
        assert!(!report.success);
        assert_eq!(report.abuse_confidence, 0);
        assert_eq!(report.wait_time_secs, Some(30.0));
    }
}
