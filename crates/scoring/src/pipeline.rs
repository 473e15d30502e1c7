//! Analysis pipeline
//!
//! The per-request flow: cache probe → feature extraction → the four
//! analyzers on concurrent tasks → optional brand-impersonation pass →
//! fusion → cache store under the verdict-driven TTL. A lost or panicked
//! analyzer task folds into its default report; only fusion-layer failures
//! surface to the caller.

use chrono::{DateTime, Utc};
use phishlens_cache::VerdictCache;
use phishlens_features::FeatureExtractor;
use phishlens_heuristics::{HeuristicReport, HeuristicScorer};
use phishlens_lookalike::impersonation::{BrandImpersonationDetector, ImpersonationReport};
use phishlens_lookalike::{LookalikeDetector, LookalikeReport};
use phishlens_ml::{MlPrediction, MlScorer};
use phishlens_threat_intel::{AbuseIpdbReport, FeedReport, ThreatIntelAggregator, ThreatIntelReport, VirusTotalReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{CompositeScorer, CompositeVerdict};

/// Domain-reputation records cache for one hour
const DOMAIN_REPUTATION_TTL: Duration = Duration::from_secs(3600);

/// Optional page context submitted alongside a URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageContext {
    pub title: Option<String>,
    pub text: Option<String>,
    pub css_colors: Option<Vec<String>>,
}

impl PageContext {
    /// Brand impersonation only runs when title or text was supplied
    pub fn has_content(&self) -> bool {
        self.title.is_some() || self.text.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("analysis failed: {0}")]
    Fusion(String),
}

/// Domain-reputation lookup result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainReputation {
    pub domain: String,
    pub is_malicious: bool,
    pub threat_score: u32,
    pub sources: DomainSources,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSources {
    pub virustotal: VirusTotalReport,
    pub abuseipdb: AbuseIpdbReport,
    pub openphish: FeedReport,
}

/// Orchestrates one URL analysis end to end
pub struct AnalysisPipeline {
    extractor: Arc<FeatureExtractor>,
    heuristics: Arc<HeuristicScorer>,
    lookalike: Arc<LookalikeDetector>,
    impersonation: Arc<BrandImpersonationDetector>,
    intel: Arc<ThreatIntelAggregator>,
    ml: Arc<MlScorer>,
    scorer: CompositeScorer,
    verdicts: Arc<VerdictCache>,
}

impl AnalysisPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extractor: Arc<FeatureExtractor>,
        heuristics: Arc<HeuristicScorer>,
        lookalike: Arc<LookalikeDetector>,
        impersonation: Arc<BrandImpersonationDetector>,
        intel: Arc<ThreatIntelAggregator>,
        ml: Arc<MlScorer>,
        scorer: CompositeScorer,
        verdicts: Arc<VerdictCache>,
    ) -> Self {
        Self {
            extractor,
            heuristics,
            lookalike,
            impersonation,
            intel,
            ml,
            scorer,
            verdicts,
        }
    }

    /// Analyze a URL, serving from cache when possible
    pub async fn analyze_url(
        &self,
        url: &str,
        page: Option<&PageContext>,
    ) -> Result<CompositeVerdict, PipelineError> {
        if let Some(cached) = self.verdicts.get_url_verdict(url).await {
            match serde_json::from_value::<CompositeVerdict>(cached) {
                Ok(verdict) => {
                    debug!(url, "cache hit");
                    return Ok(verdict);
                }
                Err(e) => {
                    // Stale layout from an older build: treat as a miss
                    warn!(url, "discarding unreadable cached verdict: {e}");
                }
            }
        }

        let features = self.extractor.extract(url).await;

        let heuristics = self.heuristics.clone();
        let features_for_rules = features.clone();
        let heuristic_task =
            tokio::spawn(async move { heuristics.evaluate(&features_for_rules) });

        let lookalike = self.lookalike.clone();
        let url_for_lookalike = url.to_string();
        let lookalike_task = tokio::spawn(async move { lookalike.detect(&url_for_lookalike) });

        let intel = self.intel.clone();
        let url_for_intel = url.to_string();
        let intel_task = tokio::spawn(async move { intel.check_url(&url_for_intel).await });

        let ml = self.ml.clone();
        let features_for_ml = features.clone();
        let ml_task = tokio::spawn(async move { ml.predict(&features_for_ml) });

        let (heuristic_result, lookalike_result, intel_result, ml_result) =
            tokio::join!(heuristic_task, lookalike_task, intel_task, ml_task);

        // A lost analyzer contributes its defaults, never a failed request
        let heuristic_report = heuristic_result.unwrap_or_else(|e| {
            error!(url, "heuristic analyzer task lost: {e}");
            HeuristicReport::default()
        });
        let lookalike_report = lookalike_result.unwrap_or_else(|e| {
            error!(url, "lookalike analyzer task lost: {e}");
            LookalikeReport::default()
        });
        let intel_report = intel_result.unwrap_or_else(|e| {
            error!(url, "threat intel task lost: {e}");
            ThreatIntelReport::default()
        });
        let ml_prediction = ml_result.unwrap_or_else(|e| {
            error!(url, "ml scorer task lost: {e}");
            MlPrediction::default()
        });

        let impersonation_report: Option<ImpersonationReport> = page
            .filter(|p| p.has_content())
            .map(|p| {
                self.impersonation.detect(
                    url,
                    p.title.as_deref(),
                    p.text.as_deref(),
                    p.css_colors.as_deref(),
                )
            });

        let verdict = self.scorer.fuse(
            &ml_prediction,
            &heuristic_report,
            &intel_report,
            &lookalike_report,
            impersonation_report.as_ref(),
        );

        let serialized = serde_json::to_value(&verdict)
            .map_err(|e| PipelineError::Fusion(e.to_string()))?;
        self.verdicts
            .store_url_verdict(url, &serialized, verdict.threat_score, verdict.risk_level.as_str())
            .await;

        info!(
            url,
            score = verdict.threat_score,
            risk = verdict.risk_level.as_str(),
            "analysis complete"
        );

        Ok(verdict)
    }

    /// Threat-intel-only reputation lookup for a bare domain
    pub async fn domain_reputation(&self, domain: &str) -> DomainReputation {
        if let Some(cached) = self.verdicts.get_source_record("domain", domain).await {
            if let Ok(report) = serde_json::from_value::<DomainReputation>(cached) {
                debug!(domain, "domain reputation cache hit");
                return report;
            }
        }

        let url = format!("https://{domain}");
        let intel = self.intel.check_url(&url).await;

        let report = DomainReputation {
            domain: domain.to_string(),
            is_malicious: intel.score >= 60,
            threat_score: intel.score,
            sources: DomainSources {
                virustotal: intel.virustotal,
                abuseipdb: intel.abuseipdb,
                openphish: intel.feed,
            },
            timestamp: Utc::now(),
        };

        if let Ok(value) = serde_json::to_value(&report) {
            self.verdicts
                .store_source_record("domain", domain, &value, Some(DOMAIN_REPUTATION_TTL))
                .await;
        }

        report
    }

    /// Threat-intel aggregator, for feed preloading at startup
    pub fn intel(&self) -> &Arc<ThreatIntelAggregator> {
        &self.intel
    }

    /// Verdict cache handle, for health reporting
    pub fn verdicts(&self) -> &Arc<VerdictCache> {
        &self.verdicts
    }

    /// Whether the primary ML model is loaded
    pub fn ml_primary_loaded(&self) -> bool {
        self.ml.has_primary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phishlens_cache::{Cache, TtlPolicy};
    use phishlens_config::Settings;

    /// Fully offline settings: zero probe timeouts degrade the TLS and WHOIS
    /// probes to sentinels instantly, the feed points at a refused port, and
    /// no API keys are configured.
    fn offline_settings() -> Settings {
        let mut settings = Settings::default();
        settings.probes.ssl_timeout_secs = 0;
        settings.probes.whois_timeout_secs = 0;
        settings.intel.phishing_feed_url = "http://127.0.0.1:9/feed.txt".to_string();
        settings.intel.feed_fetch_timeout_secs = 1;
        settings
    }

    fn offline_pipeline(settings: &Settings) -> AnalysisPipeline {
        let verdicts = Arc::new(VerdictCache::new(
            Arc::new(Cache::in_memory()),
            TtlPolicy::default(),
        ));
        AnalysisPipeline::new(
            Arc::new(FeatureExtractor::new(settings.probes)),
            Arc::new(HeuristicScorer::new()),
            Arc::new(LookalikeDetector::new()),
            Arc::new(BrandImpersonationDetector::new()),
            Arc::new(ThreatIntelAggregator::new(&settings.intel)),
            Arc::new(MlScorer::embedded()),
            CompositeScorer::new(settings.scoring),
            verdicts,
        )
    }

    #[tokio::test]
    async fn lookalike_with_homoglyph_is_blocked() {
        let settings = offline_settings();
        let pipeline = offline_pipeline(&settings);
        pipeline.intel().feed().load_entries(Vec::<String>::new());

        let verdict = pipeline
            .analyze_url("https://paypa1-verify-login.com/account", None)
            .await
            .unwrap();

        assert!(verdict.is_phishing);
        assert!(verdict.threat_score >= 70);
        assert!(matches!(
            verdict.risk_level,
            crate::RiskLevel::Dangerous | crate::RiskLevel::Critical
        ));
        assert_eq!(verdict.recommendation, crate::Recommendation::Block);
        assert_eq!(verdict.analysis.lookalike_brand.as_deref(), Some("paypal.com"));
        assert!(verdict
            .analysis
            .reasons
            .iter()
            .any(|r| r.source == "lookalike_detection"));
    }

    #[tokio::test]
    async fn known_good_domain_is_allowed() {
        let settings = offline_settings();
        let pipeline = offline_pipeline(&settings);
        pipeline.intel().feed().load_entries(Vec::<String>::new());

        let verdict = pipeline.analyze_url("https://google.com/", None).await.unwrap();

        // Offline probes leave the HTTPS-without-certificate rule firing, so
        // "safe" headroom is smaller than with live probes; still well clear
        // of the phishing bar.
        assert!(!verdict.is_phishing);
        assert!(verdict.threat_score < 60);
        assert!(!verdict.analysis.lookalike_detected);
    }

    #[tokio::test]
    async fn ip_host_trips_heuristics_hard() {
        let settings = offline_settings();
        let pipeline = offline_pipeline(&settings);
        pipeline.intel().feed().load_entries(Vec::<String>::new());

        let verdict = pipeline
            .analyze_url("http://192.168.14.22:8081/login?verify=admin", None)
            .await
            .unwrap();

        assert!(verdict.analysis.heuristic_score >= 70);
        assert!(verdict.is_phishing);
        assert_eq!(verdict.recommendation, crate::Recommendation::Block);
    }

    #[tokio::test]
    async fn suspicious_tld_lookalike_gets_override() {
        let settings = offline_settings();
        let pipeline = offline_pipeline(&settings);
        pipeline.intel().feed().load_entries(Vec::<String>::new());

        let verdict = pipeline
            .analyze_url("https://microsoft-account-verify-update.tk/signin", None)
            .await
            .unwrap();

        assert!(verdict.is_phishing);
        assert!(verdict.threat_score >= 70);
        assert_eq!(verdict.recommendation, crate::Recommendation::Block);
        assert_eq!(verdict.analysis.lookalike_brand.as_deref(), Some("microsoft.com"));
        assert!(verdict.analysis.heuristic_score >= 60);
    }

    #[tokio::test]
    async fn feed_listed_url_counts_a_confirmed_hit() {
        let settings = offline_settings();
        let pipeline = offline_pipeline(&settings);
        let listed = "http://paypal-account-verify.tk/login";
        pipeline.intel().feed().load_entries(vec![listed.to_string()]);

        let verdict = pipeline.analyze_url(listed, None).await.unwrap();

        assert!(verdict.is_phishing);
        assert!(verdict.threat_score >= 60);
        assert_eq!(verdict.analysis.threat_intel_score, 40);
        assert_eq!(verdict.analysis.threat_intel_hits, 1);
        let feed_reason = verdict
            .analysis
            .reasons
            .iter()
            .find(|r| r.factor.contains("OpenPhish"))
            .expect("feed reason present");
        assert_eq!(feed_reason.severity, "critical");
    }

    #[tokio::test]
    async fn second_submission_is_served_from_cache() {
        let settings = offline_settings();
        let pipeline = offline_pipeline(&settings);
        pipeline.intel().feed().load_entries(Vec::<String>::new());

        let url = "https://paypa1-verify-login.com/account";
        let first = pipeline.analyze_url(url, None).await.unwrap();
        let second = pipeline.analyze_url(url, None).await.unwrap();

        assert_eq!(first.threat_score, second.threat_score);
        assert_eq!(first.risk_level, second.risk_level);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.analysis.reasons, second.analysis.reasons);
        // Bit-identical including the original timestamp
        assert_eq!(first.timestamp, second.timestamp);
    }

    #[tokio::test]
    async fn page_context_enables_brand_impersonation() {
        let settings = offline_settings();
        let pipeline = offline_pipeline(&settings);
        pipeline.intel().feed().load_entries(Vec::<String>::new());

        let page = PageContext {
            title: Some("PayPal Log In".to_string()),
            text: Some("Log in to your PayPal account to send money".to_string()),
            css_colors: Some(vec!["#003087".to_string(), "#009CDE".to_string()]),
        };
        let verdict = pipeline
            .analyze_url("https://secure-account-check.com/login", Some(&page))
            .await
            .unwrap();

        assert!(verdict.analysis.brand_impersonation);
        assert_eq!(verdict.analysis.impersonated_brand.as_deref(), Some("paypal"));
        assert_eq!(verdict.analysis.reasons[0].source, "brand_impersonation");
    }

    #[tokio::test]
    async fn domain_reputation_synthesises_https_url() {
        let settings = offline_settings();
        let pipeline = offline_pipeline(&settings);
        pipeline
            .intel()
            .feed()
            .load_entries(vec!["https://bad.example".to_string()]);

        let report = pipeline.domain_reputation("bad.example").await;
        assert_eq!(report.domain, "bad.example");
        assert_eq!(report.threat_score, 40);
        assert!(!report.is_malicious); // 40 < 60 without corroborating sources
        assert!(report.sources.openphish.listed);

        // Cached on the second call
        let again = pipeline.domain_reputation("bad.example").await;
        assert_eq!(again.timestamp, report.timestamp);
    }
}
