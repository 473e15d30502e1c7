//! Application state management
//!
//! Every analyzer, the cache, and the pipeline are constructed exactly once
//! here and injected into the handlers as shared references. Nothing in the
//! request path builds components on demand.

use phishlens_cache::{Cache, TtlPolicy, VerdictCache};
use phishlens_config::Settings;
use phishlens_features::FeatureExtractor;
use phishlens_heuristics::HeuristicScorer;
use phishlens_lookalike::impersonation::BrandImpersonationDetector;
use phishlens_lookalike::LookalikeDetector;
use phishlens_ml::MlScorer;
use phishlens_scoring::{AnalysisPipeline, CompositeScorer};
use phishlens_threat_intel::ThreatIntelAggregator;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Shared application state
pub struct AppState {
    pub pipeline: AnalysisPipeline,
    pub start_time: Instant,
}

impl AppState {
    /// Construct all components and wire the pipeline
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        info!("Initializing application state");

        let cache = Arc::new(Cache::connect(&settings.cache).await);
        info!("Cache backend selected: {}", cache.backend_name());

        let verdicts = Arc::new(VerdictCache::new(
            cache,
            TtlPolicy {
                positive: Duration::from_secs(settings.cache.ttl_positive_secs),
                negative: Duration::from_secs(settings.cache.ttl_negative_secs),
            },
        ));

        let extractor = Arc::new(FeatureExtractor::new(settings.probes));
        let heuristics = Arc::new(HeuristicScorer::new());
        let lookalike = Arc::new(LookalikeDetector::new());
        let impersonation = Arc::new(BrandImpersonationDetector::new());
        info!(
            "Detectors initialized: {} heuristic rules, {} indexed brands",
            heuristics.rule_count(),
            phishlens_lookalike::brands::brand_count()
        );

        let intel = Arc::new(ThreatIntelAggregator::new(&settings.intel));
        info!("Threat intelligence aggregator initialized");

        let ml = Arc::new(MlScorer::new(&settings.ml.model_path));
        info!("ML scorer initialized (primary loaded: {})", ml.has_primary());

        let pipeline = AnalysisPipeline::new(
            extractor,
            heuristics,
            lookalike,
            impersonation,
            intel,
            ml,
            CompositeScorer::new(settings.scoring),
            verdicts,
        );

        info!("Application state initialized");

        Ok(Self {
            pipeline,
            start_time: Instant::now(),
        })
    }
}
