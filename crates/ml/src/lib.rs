//! ML scoring collaborator
//!
//! The pipeline hands this crate the fixed feature vector and receives an
//! opaque phishing probability with a confidence. The primary model is a
//! coefficient file loaded from the configured path at startup; when it is
//! absent or misbehaves, prediction falls back internally to the embedded
//! logistic model and never fails. Inference is pure arithmetic and sits
//! comfortably inside the 50 ms deadline.

use phishlens_features::{UrlFeatures, FEATURE_ORDER};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

/// Coefficients of the embedded fallback model, fitted offline and compiled
/// in. Keyed by feature name so reordering the vector cannot skew them.
const FALLBACK_BIAS: f64 = -3.4;
const FALLBACK_COEFFICIENTS: &[(&str, f64)] = &[
    ("has_ip_address", 3.2),
    ("suspicious_keyword_count", 0.9),
    ("has_suspicious_tld", 1.6),
    ("prefix_suffix_in_domain", 0.7),
    ("at_symbol", 1.2),
    ("uses_non_standard_port", 0.9),
    ("is_https", -0.8),
    ("domain_registered_recently", 1.1),
    ("url_entropy", 0.25),
    ("digit_ratio", 2.0),
    ("url_length", 0.01),
    ("subdomain_count", 0.4),
    ("hyphen_count", 0.15),
    ("has_double_slash_redirecting", 0.8),
];

/// Prediction contract returned to the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlPrediction {
    /// Phishing probability in [0, 1]
    pub probability: f64,
    /// Distance of the probability from indifference, in [0, 1]
    pub confidence: f64,
    pub model_used: String,
    /// Top contributing (feature, weight) pairs, strongest first
    pub feature_importance: Vec<(String, f64)>,
    pub inference_time_ms: f64,
}

impl Default for MlPrediction {
    /// Contribution-free prediction, used when the scorer task is lost
    fn default() -> Self {
        Self {
            probability: 0.0,
            confidence: 0.0,
            model_used: "none".to_string(),
            feature_importance: Vec::new(),
            inference_time_ms: 0.0,
        }
    }
}

/// Loadable model weights, one coefficient per feature name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelWeights {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub version: String,
    pub bias: f64,
    pub coefficients: HashMap<String, f64>,
}

impl ModelWeights {
    fn embedded_fallback() -> Self {
        Self {
            model: "logistic_regression".to_string(),
            version: "embedded".to_string(),
            bias: FALLBACK_BIAS,
            coefficients: FALLBACK_COEFFICIENTS
                .iter()
                .map(|(name, coef)| (name.to_string(), *coef))
                .collect(),
        }
    }

    fn score(&self, vector: &[f64]) -> f64 {
        let mut z = self.bias;
        for (name, value) in FEATURE_ORDER.iter().zip(vector) {
            if let Some(coef) = self.coefficients.get(*name) {
                z += coef * value;
            }
        }
        sigmoid(z)
    }

    fn importance(&self, vector: &[f64]) -> Vec<(String, f64)> {
        let mut contributions: Vec<(String, f64)> = FEATURE_ORDER
            .iter()
            .zip(vector)
            .filter_map(|(name, value)| {
                self.coefficients
                    .get(*name)
                    .map(|coef| (name.to_string(), round4((coef * value).abs())))
            })
            .filter(|(_, weight)| *weight > 0.0)
            .collect();
        contributions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        contributions.truncate(10);
        contributions
    }
}

/// Phishing probability scorer with internal fallback
pub struct MlScorer {
    primary: Option<ModelWeights>,
    fallback: ModelWeights,
}

impl MlScorer {
    /// Load the primary model from `model_path`; a missing or malformed file
    /// leaves only the embedded fallback active.
    pub fn new(model_path: &str) -> Self {
        let primary = match std::fs::read_to_string(model_path) {
            Ok(raw) => match serde_json::from_str::<ModelWeights>(&raw) {
                Ok(weights) => {
                    let unknown: Vec<&String> = weights
                        .coefficients
                        .keys()
                        .filter(|k| !FEATURE_ORDER.contains(&k.as_str()))
                        .collect();
                    if !unknown.is_empty() {
                        warn!(?unknown, "model file names unknown features; they are ignored");
                    }
                    info!(path = model_path, version = %weights.version, "primary model loaded");
                    Some(weights)
                }
                Err(e) => {
                    warn!(path = model_path, "failed to parse model file: {e}");
                    None
                }
            },
            Err(_) => {
                info!(path = model_path, "no primary model file, using embedded fallback");
                None
            }
        };

        Self {
            primary,
            fallback: ModelWeights::embedded_fallback(),
        }
    }

    /// Scorer with only the embedded model, for tests and degraded startup
    pub fn embedded() -> Self {
        Self {
            primary: None,
            fallback: ModelWeights::embedded_fallback(),
        }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Predict the phishing probability for a feature record. Never fails:
    /// a primary model producing non-finite output falls back internally.
    pub fn predict(&self, features: &UrlFeatures) -> MlPrediction {
        let started = Instant::now();
        let vector = features.to_vector();

        let (model, mut model_used) = match &self.primary {
            Some(primary) => (primary, "primary"),
            None => (&self.fallback, "fallback"),
        };

        let mut probability = model.score(&vector);
        if !probability.is_finite() {
            warn!("primary model produced non-finite probability, falling back");
            probability = self.fallback.score(&vector);
            model_used = "fallback";
        }

        let probability = round4(probability.clamp(0.0, 1.0));
        let active = if model_used == "primary" {
            self.primary.as_ref().unwrap_or(&self.fallback)
        } else {
            &self.fallback
        };

        MlPrediction {
            probability,
            confidence: round4((probability - 0.5).abs() * 2.0),
            model_used: model_used.to_string(),
            feature_importance: active.importance(&vector),
            inference_time_ms: (started.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0,
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
