//! Lookalike-domain detection
//!
//! Compares a candidate's registrable-domain label against the curated brand
//! index: embedded-brand matching (with and without homoglyph substitution),
//! Levenshtein similarity, and aligned homoglyph/mixed-script checks. A brand
//! label equal to the candidate is never reported — that is the legitimate
//! site.

pub mod brands;
pub mod homoglyphs;
pub mod impersonation;

use phishlens_features::{parse_parts, UrlParts};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Similarity granted when a brand label is embedded in a longer candidate
const EMBEDDED_SIMILARITY: f64 = 0.95;

/// Shortest brand label eligible for embedded matching. Two-letter brands
/// would otherwise flag every label containing their letters.
const MIN_EMBEDDED_BRAND_LEN: usize = 4;

/// Outcome of lookalike detection for one URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookalikeReport {
    pub is_lookalike: bool,
    /// 0-100, boosted for homoglyphs and near-exact similarity
    pub score: u32,
    pub matched_brand: Option<String>,
    pub brand_category: Option<String>,
    /// Best similarity ratio across the index, rounded to 4 decimals
    pub similarity: f64,
    /// Levenshtein distance to the best match (999 when nothing compared)
    pub distance: usize,
    pub homoglyph_detected: bool,
    pub homoglyph_details: Option<String>,
}

impl Default for LookalikeReport {
    fn default() -> Self {
        Self {
            is_lookalike: false,
            score: 0,
            matched_brand: None,
            brand_category: None,
            similarity: 0.0,
            distance: 999,
            homoglyph_detected: false,
            homoglyph_details: None,
        }
    }
}

struct BestMatch {
    domain: &'static str,
    label: &'static str,
    category: &'static str,
    similarity: f64,
    distance: usize,
    /// Substitution found while matching the brand as an embedded window
    embedded_substitution: Option<(usize, char, char)>,
}

/// Detects typosquatting and homoglyph impersonation of indexed brands
pub struct LookalikeDetector {
    similarity_threshold: f64,
}

impl LookalikeDetector {
    pub fn new() -> Self {
        Self {
            similarity_threshold: 0.85,
        }
    }

    /// Analyze a URL's registrable-domain label against the brand index
    pub fn detect(&self, url: &str) -> LookalikeReport {
        let Some(parts) = parse_parts(url) else {
            return LookalikeReport::default();
        };
        let label = candidate_label(url, &parts);

        let Some(best) = self.best_match(&label) else {
            return LookalikeReport::default();
        };

        // Homoglyph evidence: in-place substitution against the best match,
        // the substitution observed during embedded matching, or a label
        // spanning more than one script.
        let substitution =
            homoglyphs::aligned_substitution(&label, best.label).or(best.embedded_substitution);
        let homoglyph_details = substitution
            .map(|(pos, seen, expected)| {
                format!("Uses '{}' instead of '{}' at position {}", seen, expected, pos + 1)
            })
            .or_else(|| homoglyphs::mixed_scripts(&label));
        let homoglyph_detected = homoglyph_details.is_some();

        let is_lookalike = (best.similarity >= self.similarity_threshold && best.label != label)
            || homoglyph_detected;

        let mut score = 0u32;
        if is_lookalike {
            score = (best.similarity * 100.0) as u32;
            if homoglyph_detected {
                score = (score + 15).min(100);
            }
            if best.similarity > 0.95 {
                score = (score + 10).min(100);
            }
        }

        debug!(
            label,
            brand = best.domain,
            similarity = best.similarity,
            homoglyph = homoglyph_detected,
            score,
            "lookalike detection"
        );

        LookalikeReport {
            is_lookalike,
            score,
            matched_brand: is_lookalike.then(|| best.domain.to_string()),
            brand_category: is_lookalike.then(|| best.category.to_string()),
            similarity: (best.similarity * 10_000.0).round() / 10_000.0,
            distance: best.distance,
            homoglyph_detected,
            homoglyph_details,
        }
    }

    fn best_match(&self, label: &str) -> Option<BestMatch> {
        let label_len = label.chars().count();
        let mut best: Option<BestMatch> = None;

        for (category, domain, brand_label) in brands::iter_brands() {
            let brand_len = brand_label.chars().count();
            let embeddable = brand_len >= MIN_EMBEDDED_BRAND_LEN;

            let (similarity, distance, embedded_substitution) =
                if embeddable && label.contains(brand_label) && brand_label != label {
                    // Embedded brand, e.g. paypal in paypal-secure-verify
                    (EMBEDDED_SIMILARITY, label_len - brand_len, None)
                } else if embeddable && label != brand_label {
                    match homoglyphs::find_confusable_embedding(label, brand_label) {
                        Some(sub) => (
                            EMBEDDED_SIMILARITY,
                            label_len.saturating_sub(brand_len),
                            Some(sub),
                        ),
                        None => (
                            strsim::normalized_levenshtein(label, brand_label),
                            strsim::levenshtein(label, brand_label),
                            None,
                        ),
                    }
                } else {
                    (
                        strsim::normalized_levenshtein(label, brand_label),
                        strsim::levenshtein(label, brand_label),
                        None,
                    )
                };

            // Strictly greater: ties keep the first brand encountered
            if best.as_ref().map_or(true, |b| similarity > b.similarity) {
                best = Some(BestMatch {
                    domain,
                    label: brand_label,
                    category,
                    similarity,
                    distance,
                    embedded_substitution,
                });
            }
        }

        best
    }
}

impl Default for LookalikeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Label to compare against the index.
///
/// The URL parser punycodes IDN hosts, which would hide the very characters
/// homoglyph detection looks for, so when the parsed host carries an `xn--`
/// segment the label is recovered from the raw URL text instead.
fn candidate_label(raw: &str, parts: &UrlParts) -> String {
    if parts.host.contains("xn--") {
        if let Some(label) = raw_unicode_label(raw, parts) {
            return label;
        }
    }
    parts.label.to_lowercase()
}

fn raw_unicode_label(raw: &str, parts: &UrlParts) -> Option<String> {
    let after_scheme = raw.split("://").nth(1)?;
    let host_end = after_scheme
        .find(['/', ':', '?', '#'])
        .unwrap_or(after_scheme.len());
    let host = after_scheme[..host_end].rsplit('@').next()?;

    let labels: Vec<&str> = host.split('.').collect();
    let suffix_count = if parts.suffix.is_empty() {
        0
    } else {
        parts.suffix.split('.').count()
    };

    if labels.len() > suffix_count {
        Some(labels[labels.len() - 1 - suffix_count].to_lowercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(url: &str) -> LookalikeReport {
        LookalikeDetector::new().detect(url)
    }

    #[test]
    fn exact_brand_domain_is_not_a_lookalike() {
        let report = detect("https://google.com/");
        assert!(!report.is_lookalike);
        assert_eq!(report.score, 0);
        assert!(report.matched_brand.is_none());
        // Similarity is still reported for the identical label
        assert_eq!(report.similarity, 1.0);
    }

    #[test]
    fn embedded_brand_scores_high() {
        let report = detect("https://paypal-secure-verify.com/login");
        assert!(report.is_lookalike);
        assert_eq!(report.matched_brand.as_deref(), Some("paypal.com"));
        assert_eq!(report.brand_category.as_deref(), Some("financial"));
        assert_eq!(report.similarity, 0.95);
        assert!(report.score >= 95);
    }

    #[test]
    fn digit_substituted_embedded_brand_flags_homoglyph() {
        let report = detect("https://paypa1-verify-login.com/account");
        assert!(report.is_lookalike);
        assert!(report.homoglyph_detected);
        assert_eq!(report.matched_brand.as_deref(), Some("paypal.com"));
        assert_eq!(
            report.homoglyph_details.as_deref(),
            Some("Uses '1' instead of 'l' at position 6")
        );
        // 95 from embedding + 15 homoglyph bonus
        assert_eq!(report.score, 100);
    }

    #[test]
    fn close_typo_crosses_similarity_threshold() {
        // facebok vs facebook: distance 1 on 8 chars = 0.875
        let report = detect("https://facebok.com/");
        assert!(report.is_lookalike);
        assert_eq!(report.matched_brand.as_deref(), Some("facebook.com"));
        assert_eq!(report.distance, 1);
        assert!(report.similarity >= 0.85);
    }

    #[test]
    fn homoglyph_below_similarity_threshold_still_flags() {
        // qaypa1 vs paypal: similarity 4/6, but '1' for 'l' is confusable
        let report = detect("https://qaypa1.com/");
        assert!(report.similarity < 0.85);
        assert!(report.homoglyph_detected);
        assert!(report.is_lookalike);
        assert!(report.score < 85);
    }

    #[test]
    fn unrelated_domain_is_clean() {
        let report = detect("https://zqwhkjv-enterprises.org/");
        assert!(!report.is_lookalike, "matched {:?}", report.matched_brand);
        assert_eq!(report.score, 0);
    }

    #[test]
    fn idn_host_keeps_unicode_for_homoglyph_check() {
        // Cyrillic а in an otherwise Latin label
        let report = detect("https://pаypal-help.com/");
        assert!(report.homoglyph_detected, "details: {:?}", report.homoglyph_details);
        assert!(report.is_lookalike);
        assert_eq!(report.matched_brand.as_deref(), Some("paypal.com"));
    }
}
