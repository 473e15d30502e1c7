//! PhishLens configuration
//!
//! All settings are environment-scoped and read once at startup. Components
//! receive the relevant sub-struct by value during construction and never
//! consult the environment afterwards.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Top-level application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub intel: IntelSettings,
    pub cache: CacheSettings,
    pub scoring: ScoringSettings,
    pub probes: ProbeSettings,
    pub ml: MlSettings,
    pub performance: PerformanceSettings,
}

/// Threat-intelligence source credentials, endpoints, and rate budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelSettings {
    pub virustotal_api_key: Option<String>,
    pub abuseipdb_api_key: Option<String>,
    pub phishing_feed_url: String,
    /// Outbound API call timeout in seconds
    pub request_timeout_secs: u64,
    /// VirusTotal calls allowed per minute
    pub virustotal_rate_limit: usize,
    /// AbuseIPDB calls allowed per day
    pub abuseipdb_rate_limit: usize,
    /// Seconds between feed refreshes
    pub feed_refresh_secs: u64,
    /// Timeout for a single feed fetch in seconds
    pub feed_fetch_timeout_secs: u64,
}

/// Cache backend coordinates and verdict TTLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: u8,
    pub redis_password: Option<String>,
    /// TTL for verdicts that flagged the URL (seconds)
    pub ttl_positive_secs: u64,
    /// TTL for verdicts that cleared the URL (seconds)
    pub ttl_negative_secs: u64,
}

/// Fusion weights and risk thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringSettings {
    pub weight_ml: f64,
    pub weight_heuristic: f64,
    pub weight_threat_intel: f64,
    pub weight_lookalike: f64,
    pub threshold_safe: u32,
    pub threshold_suspicious: u32,
    pub threshold_dangerous: u32,
}

/// Network-side feature probe timeouts
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProbeSettings {
    pub ssl_timeout_secs: u64,
    pub whois_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlSettings {
    /// Path to the primary model weight file (JSON)
    pub model_path: String,
    /// Inference deadline in milliseconds
    pub inference_deadline_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceSettings {
    /// End-to-end analysis latency target in milliseconds
    pub target_latency_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            intel: IntelSettings {
                virustotal_api_key: None,
                abuseipdb_api_key: None,
                phishing_feed_url: "https://openphish.com/feed.txt".to_string(),
                request_timeout_secs: 3,
                virustotal_rate_limit: 4,
                abuseipdb_rate_limit: 1000,
                feed_refresh_secs: 900,
                feed_fetch_timeout_secs: 10,
            },
            cache: CacheSettings {
                redis_host: "localhost".to_string(),
                redis_port: 6379,
                redis_db: 0,
                redis_password: None,
                ttl_positive_secs: 604_800,
                ttl_negative_secs: 86_400,
            },
            scoring: ScoringSettings {
                weight_ml: 0.40,
                weight_heuristic: 0.25,
                weight_threat_intel: 0.30,
                weight_lookalike: 0.05,
                threshold_safe: 30,
                threshold_suspicious: 60,
                threshold_dangerous: 85,
            },
            probes: ProbeSettings {
                ssl_timeout_secs: 2,
                whois_timeout_secs: 5,
            },
            ml: MlSettings {
                model_path: "models/weights.json".to_string(),
                inference_deadline_ms: 50,
            },
            performance: PerformanceSettings {
                target_latency_ms: 200,
            },
        }
    }
}

impl Settings {
    /// Load settings from the process environment, falling back to defaults
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        settings.intel.virustotal_api_key = env_opt("VIRUSTOTAL_API_KEY");
        settings.intel.abuseipdb_api_key = env_opt("ABUSEIPDB_API_KEY");
        if let Some(url) = env_opt("PHISHING_FEED_URL") {
            settings.intel.phishing_feed_url = url;
        }
        env_parse("INTEL_REQUEST_TIMEOUT_SECS", &mut settings.intel.request_timeout_secs);
        env_parse("VIRUSTOTAL_RATE_LIMIT", &mut settings.intel.virustotal_rate_limit);
        env_parse("ABUSEIPDB_RATE_LIMIT", &mut settings.intel.abuseipdb_rate_limit);
        env_parse("FEED_REFRESH_SECS", &mut settings.intel.feed_refresh_secs);

        if let Some(host) = env_opt("REDIS_HOST") {
            settings.cache.redis_host = host;
        }
        env_parse("REDIS_PORT", &mut settings.cache.redis_port);
        env_parse("REDIS_DB", &mut settings.cache.redis_db);
        settings.cache.redis_password = env_opt("REDIS_PASSWORD");
        env_parse("CACHE_TTL_POSITIVE_SECS", &mut settings.cache.ttl_positive_secs);
        env_parse("CACHE_TTL_NEGATIVE_SECS", &mut settings.cache.ttl_negative_secs);

        env_parse("WEIGHT_ML", &mut settings.scoring.weight_ml);
        env_parse("WEIGHT_HEURISTIC", &mut settings.scoring.weight_heuristic);
        env_parse("WEIGHT_THREAT_INTEL", &mut settings.scoring.weight_threat_intel);
        env_parse("WEIGHT_LOOKALIKE", &mut settings.scoring.weight_lookalike);
        env_parse("THRESHOLD_SAFE", &mut settings.scoring.threshold_safe);
        env_parse("THRESHOLD_SUSPICIOUS", &mut settings.scoring.threshold_suspicious);
        env_parse("THRESHOLD_DANGEROUS", &mut settings.scoring.threshold_dangerous);

        env_parse("SSL_TIMEOUT_SECS", &mut settings.probes.ssl_timeout_secs);
        env_parse("WHOIS_TIMEOUT_SECS", &mut settings.probes.whois_timeout_secs);

        if let Some(path) = env_opt("ML_MODEL_PATH") {
            settings.ml.model_path = path;
        }
        env_parse("ML_INFERENCE_DEADLINE_MS", &mut settings.ml.inference_deadline_ms);
        env_parse("TARGET_LATENCY_MS", &mut settings.performance.target_latency_ms);

        info!(
            "Settings loaded: virustotal={}, abuseipdb={}, feed={}",
            settings.intel.virustotal_api_key.is_some(),
            settings.intel.abuseipdb_api_key.is_some(),
            settings.intel.phishing_feed_url
        );

        settings
    }
}

impl IntelSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn feed_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.feed_refresh_secs)
    }

    pub fn feed_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_fetch_timeout_secs)
    }
}

impl ProbeSettings {
    pub fn ssl_timeout(&self) -> Duration {
        Duration::from_secs(self.ssl_timeout_secs)
    }

    pub fn whois_timeout(&self) -> Duration {
        Duration::from_secs(self.whois_timeout_secs)
    }
}

impl CacheSettings {
    /// Connection URL for the Redis backend
    pub fn redis_url(&self) -> String {
        match &self.redis_password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.redis_host, self.redis_port, self.redis_db
            ),
            None => format!(
                "redis://{}:{}/{}",
                self.redis_host, self.redis_port, self.redis_db
            ),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        if let Ok(value) = raw.parse() {
            *target = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let s = Settings::default();
        let total = s.scoring.weight_ml
            + s.scoring.weight_heuristic
            + s.scoring.weight_threat_intel
            + s.scoring.weight_lookalike;
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn redis_url_includes_password_when_set() {
        let mut s = Settings::default();
        assert_eq!(s.cache.redis_url(), "redis://localhost:6379/0");
        s.cache.redis_password = Some("secret".to_string());
        assert_eq!(s.cache.redis_url(), "redis://:secret@localhost:6379/0");
    }

    #[test]
    fn thresholds_are_ordered() {
        let s = Settings::default();
        assert!(s.scoring.threshold_safe < s.scoring.threshold_suspicious);
        assert!(s.scoring.threshold_suspicious < s.scoring.threshold_dangerous);
    }
}
