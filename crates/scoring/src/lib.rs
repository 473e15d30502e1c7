//! Score fusion and the analysis pipeline
//!
//! Shared verdict types plus the two moving parts: [`composite::CompositeScorer`]
//! fuses the analyzer outputs into a single calibrated verdict, and
//! [`pipeline::AnalysisPipeline`] drives cache probe → extraction → parallel
//! analysis → fusion → cache store for each request.

pub mod composite;
pub mod pipeline;

use phishlens_config::ScoringSettings;
use serde::{Deserialize, Serialize};

pub use composite::CompositeScorer;
pub use pipeline::{AnalysisPipeline, DomainReputation, PageContext, PipelineError};

/// Categorical risk level derived from the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Suspicious,
    Dangerous,
    Critical,
}

impl RiskLevel {
    /// Threshold mapping: safe ≤ 30 < suspicious ≤ 60 < dangerous ≤ 85 < critical
    pub fn from_score(score: u32, thresholds: &ScoringSettings) -> Self {
        if score <= thresholds.threshold_safe {
            RiskLevel::Safe
        } else if score <= thresholds.threshold_suspicious {
            RiskLevel::Suspicious
        } else if score <= thresholds.threshold_dangerous {
            RiskLevel::Dangerous
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Suspicious => "suspicious",
            RiskLevel::Dangerous => "dangerous",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Action recommended to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Allow,
    Warn,
    Block,
}

impl Recommendation {
    pub fn from_risk(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Safe => Recommendation::Allow,
            RiskLevel::Suspicious => Recommendation::Warn,
            RiskLevel::Dangerous | RiskLevel::Critical => Recommendation::Block,
        }
    }
}

/// One ranked, human-readable contributing reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatReason {
    pub factor: String,
    pub severity: String,
    /// Contribution percentage used for ranking
    pub weight: u32,
    pub source: String,
}

/// Per-source breakdown carried in the verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBreakdown {
    pub ml_prediction: f64,
    pub ml_contribution: f64,
    pub heuristic_score: u32,
    pub heuristic_contribution: f64,
    pub threat_intel_score: u32,
    pub threat_intel_contribution: f64,
    pub threat_intel_hits: u32,
    pub lookalike_detected: bool,
    pub lookalike_score: u32,
    pub lookalike_contribution: f64,
    pub lookalike_brand: Option<String>,
    pub brand_impersonation: bool,
    pub impersonated_brand: Option<String>,
    pub reasons: Vec<ThreatReason>,
    pub model_used: String,
    pub inference_time_ms: f64,
}

/// Final fused verdict, exactly the shape cached and returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeVerdict {
    pub threat_score: u32,
    pub risk_level: RiskLevel,
    pub is_phishing: bool,
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub analysis: AnalysisBreakdown,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use phishlens_config::Settings;

    #[test]
    fn risk_level_mapping_is_exact_at_boundaries() {
        let t = Settings::default().scoring;
        assert_eq!(RiskLevel::from_score(0, &t), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(30, &t), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(31, &t), RiskLevel::Suspicious);
        assert_eq!(RiskLevel::from_score(60, &t), RiskLevel::Suspicious);
        assert_eq!(RiskLevel::from_score(61, &t), RiskLevel::Dangerous);
        assert_eq!(RiskLevel::from_score(85, &t), RiskLevel::Dangerous);
        assert_eq!(RiskLevel::from_score(86, &t), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100, &t), RiskLevel::Critical);
    }

    #[test]
    fn recommendation_follows_risk() {
        assert_eq!(Recommendation::from_risk(RiskLevel::Safe), Recommendation::Allow);
        assert_eq!(Recommendation::from_risk(RiskLevel::Suspicious), Recommendation::Warn);
        assert_eq!(Recommendation::from_risk(RiskLevel::Dangerous), Recommendation::Block);
        assert_eq!(Recommendation::from_risk(RiskLevel::Critical), Recommendation::Block);
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Dangerous).unwrap(), "\"dangerous\"");
        assert_eq!(serde_json::to_string(&Recommendation::Block).unwrap(), "\"block\"");
    }
}
