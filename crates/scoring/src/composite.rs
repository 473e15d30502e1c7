//! Composite scorer
//!
//! Weighted fusion of the four analyzer scores with adaptive reweighting for
//! high-confidence lookalikes, hard override rules that can only raise the
//! verdict, a blended confidence, and a contribution-ranked reason list.

use chrono::Utc;
use phishlens_config::ScoringSettings;
use phishlens_heuristics::HeuristicReport;
use phishlens_lookalike::impersonation::ImpersonationReport;
use phishlens_lookalike::LookalikeReport;
use phishlens_ml::MlPrediction;
use phishlens_threat_intel::ThreatIntelReport;
use tracing::debug;

use crate::{AnalysisBreakdown, CompositeVerdict, Recommendation, RiskLevel, ThreatReason};

/// Weights used when a high-confidence lookalike shifts trust toward the
/// brand-matching evidence
const ADAPTIVE_WEIGHTS: (f64, f64, f64, f64) = (0.20, 0.25, 0.20, 0.35);

/// Contributions below this many points produce no reason entries
const REASON_CONTRIBUTION_FLOOR: f64 = 5.0;

/// Fuses analyzer outputs into the final verdict
pub struct CompositeScorer {
    settings: ScoringSettings,
}

impl CompositeScorer {
    pub fn new(settings: ScoringSettings) -> Self {
        Self { settings }
    }

    pub fn fuse(
        &self,
        ml: &MlPrediction,
        heuristic: &HeuristicReport,
        intel: &ThreatIntelReport,
        lookalike: &LookalikeReport,
        impersonation: Option<&ImpersonationReport>,
    ) -> CompositeVerdict {
        let ml_pct = ml.probability * 100.0;

        // Adaptive reweighting: a near-certain lookalike outranks the model
        let (w_ml, w_heur, w_intel, w_look) = if lookalike.is_lookalike && lookalike.score >= 90 {
            ADAPTIVE_WEIGHTS
        } else {
            (
                self.settings.weight_ml,
                self.settings.weight_heuristic,
                self.settings.weight_threat_intel,
                self.settings.weight_lookalike,
            )
        };

        let ml_contribution = ml_pct * w_ml;
        let heuristic_contribution = heuristic.score as f64 * w_heur;
        let intel_contribution = intel.score as f64 * w_intel;
        let lookalike_contribution = lookalike.score as f64 * w_look;

        let raw =
            ml_contribution + heuristic_contribution + intel_contribution + lookalike_contribution;
        let mut composite = (raw.round().clamp(0.0, 100.0)) as u32;

        let mut is_phishing = composite >= self.settings.threshold_suspicious;

        // Hard overrides: strong lookalike evidence forces the verdict and
        // floors the score. max() keeps the adjustment monotone upward.
        let override_fires = lookalike.is_lookalike
            && ((lookalike.score >= 90 && heuristic.score >= 60)
                || (lookalike.score >= 80 && heuristic.score >= 50)
                || (lookalike.score >= 75 && lookalike.homoglyph_detected));
        if override_fires {
            is_phishing = true;
            composite = composite.max(self.settings.threshold_suspicious + 10);
        }

        let risk_level = RiskLevel::from_score(composite, &self.settings);

        let confidence = {
            let mut c = ml.confidence * 0.6;
            c += (intel.hits as f64 * 0.15).min(0.3);
            if lookalike.is_lookalike {
                c += 0.1;
            }
            (c.min(0.99) * 100.0).round() / 100.0
        };

        let reasons = self.rank_reasons(
            composite,
            ml,
            heuristic,
            intel,
            lookalike,
            impersonation,
            [
                ml_contribution,
                heuristic_contribution,
                intel_contribution,
                lookalike_contribution,
            ],
        );

        debug!(
            composite,
            risk = risk_level.as_str(),
            is_phishing,
            override_fires,
            "composite fusion"
        );

        CompositeVerdict {
            threat_score: composite,
            risk_level,
            is_phishing,
            confidence,
            recommendation: Recommendation::from_risk(risk_level),
            analysis: AnalysisBreakdown {
                ml_prediction: ml.probability,
                ml_contribution: round2(ml_contribution),
                heuristic_score: heuristic.score,
                heuristic_contribution: round2(heuristic_contribution),
                threat_intel_score: intel.score,
                threat_intel_contribution: round2(intel_contribution),
                threat_intel_hits: intel.hits,
                lookalike_detected: lookalike.is_lookalike,
                lookalike_score: lookalike.score,
                lookalike_contribution: round2(lookalike_contribution),
                lookalike_brand: lookalike.matched_brand.clone(),
                brand_impersonation: impersonation.map(|b| b.is_impersonating).unwrap_or(false),
                impersonated_brand: impersonation
                    .filter(|b| b.is_impersonating)
                    .and_then(|b| b.suspected_brand.clone()),
                reasons,
                model_used: ml.model_used.clone(),
                inference_time_ms: ml.inference_time_ms,
            },
            timestamp: Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn rank_reasons(
        &self,
        composite: u32,
        ml: &MlPrediction,
        heuristic: &HeuristicReport,
        intel: &ThreatIntelReport,
        lookalike: &LookalikeReport,
        impersonation: Option<&ImpersonationReport>,
        contributions: [f64; 4],
    ) -> Vec<ThreatReason> {
        let [ml_c, heur_c, intel_c, look_c] = contributions;
        let mut ranked: Vec<(&str, f64)> = vec![
            ("ml", ml_c),
            ("heuristic", heur_c),
            ("threat_intel", intel_c),
            ("lookalike", look_c),
        ];
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut reasons = Vec::new();

        for (source, contribution) in ranked {
            if contribution < REASON_CONTRIBUTION_FLOOR {
                continue;
            }
            let weight_percent = if composite > 0 {
                ((contribution / composite as f64) * 100.0) as u32
            } else {
                0
            };

            match source {
                "threat_intel" => {
                    for text in intel.reasons.iter().take(3) {
                        let severity = if text.contains("OpenPhish") { "critical" } else { "high" };
                        reasons.push(ThreatReason {
                            factor: text.clone(),
                            severity: severity.to_string(),
                            weight: weight_percent,
                            source: "threat_intelligence".to_string(),
                        });
                    }
                }
                "lookalike" if lookalike.is_lookalike => {
                    let brand = lookalike
                        .matched_brand
                        .as_deref()
                        .unwrap_or("unknown brand");
                    let factor = match &lookalike.homoglyph_details {
                        Some(detail) => format!("Lookalike domain: {detail} (impersonating {brand})"),
                        None => format!("Lookalike domain detected: similar to {brand}"),
                    };
                    reasons.push(ThreatReason {
                        factor,
                        severity: "critical".to_string(),
                        weight: weight_percent,
                        source: "lookalike_detection".to_string(),
                    });
                }
                "heuristic" => {
                    for rule in heuristic.matched_rules.iter().take(3) {
                        let rule_weight = if heuristic.score > 0 {
                            ((rule.score as f64 / heuristic.score as f64) * weight_percent as f64)
                                as u32
                        } else {
                            0
                        };
                        reasons.push(ThreatReason {
                            factor: rule.explanation.clone(),
                            severity: rule.severity.as_str().to_string(),
                            weight: rule_weight,
                            source: "heuristic_analysis".to_string(),
                        });
                    }
                }
                "ml" => {
                    reasons.push(ThreatReason {
                        factor: format!(
                            "ML model predicts {}% probability of phishing",
                            (ml.probability * 100.0).round() as u32
                        ),
                        severity: severity_from_contribution(weight_percent).to_string(),
                        weight: weight_percent,
                        source: "machine_learning".to_string(),
                    });
                }
                _ => {}
            }
        }

        if let Some(brand_hit) = impersonation.filter(|b| b.is_impersonating) {
            let brand = brand_hit.suspected_brand.as_deref().unwrap_or("unknown brand");
            reasons.insert(
                0,
                ThreatReason {
                    factor: format!("Page is impersonating {}", title_case(brand)),
                    severity: "critical".to_string(),
                    weight: brand_hit.score,
                    source: "brand_impersonation".to_string(),
                },
            );
        }

        // Stable sort: equal weights keep their source grouping
        reasons.sort_by(|a, b| b.weight.cmp(&a.weight));
        reasons.truncate(10);
        reasons
    }
}

fn severity_from_contribution(weight_percent: u32) -> &'static str {
    if weight_percent >= 30 {
        "critical"
    } else if weight_percent >= 20 {
        "high"
    } else if weight_percent >= 10 {
        "medium"
    } else {
        "low"
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
