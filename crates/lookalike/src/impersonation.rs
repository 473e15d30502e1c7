//! Brand-impersonation detection
//!
//! Fuses page-content signals (title, text, CSS palette) with domain
//! dissimilarity against a fixed set of brand signatures. Only runs when the
//! caller supplied page context; a brand whose name appears in the candidate
//! domain is skipped as the legitimate site.

use phishlens_features::parse_parts;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Minimum fused score before a brand is reported as impersonated
const IMPERSONATION_THRESHOLD: u32 = 40;

struct BrandSignature {
    name: &'static str,
    colors: &'static [&'static str],
    keywords: &'static [&'static str],
    patterns: &'static [&'static str],
}

const SIGNATURES: &[BrandSignature] = &[
    BrandSignature {
        name: "google",
        colors: &["#4285F4", "#EA4335", "#FBBC04", "#34A853"],
        keywords: &["google", "gmail", "sign in", "account"],
        patterns: &[r"google\s+account", r"gmail\s+sign", r"@gmail\.com"],
    },
    BrandSignature {
        name: "microsoft",
        colors: &["#00A4EF", "#7FBA00", "#FFB900", "#F25022"],
        keywords: &["microsoft", "office", "outlook", "onedrive", "microsoft 365"],
        patterns: &[r"microsoft\s+account", r"office\s+365", r"outlook\s+sign"],
    },
    BrandSignature {
        name: "apple",
        colors: &["#000000", "#FFFFFF", "#555555"],
        keywords: &["apple", "icloud", "apple id", "app store"],
        patterns: &[r"apple\s+id", r"icloud\s+sign", r"@icloud\.com"],
    },
    BrandSignature {
        name: "amazon",
        colors: &["#FF9900", "#146EB4", "#232F3E"],
        keywords: &["amazon", "prime", "aws", "sign in"],
        patterns: &[r"amazon\s+account", r"amazon\s+prime", r"aws\s+console"],
    },
    BrandSignature {
        name: "facebook",
        colors: &["#1877F2", "#4267B2", "#385898"],
        keywords: &["facebook", "meta", "log in", "sign up"],
        patterns: &[r"facebook\s+log", r"@facebook\.com", r"meta\s+account"],
    },
    BrandSignature {
        name: "meta",
        colors: &["#0081FB", "#0668E1"],
        keywords: &["meta", "facebook", "instagram", "whatsapp"],
        patterns: &[r"meta\s+account", r"meta\s+quest"],
    },
    BrandSignature {
        name: "paypal",
        colors: &["#003087", "#009CDE", "#012169"],
        keywords: &["paypal", "payment", "send money", "log in"],
        patterns: &[r"paypal\s+account", r"paypal\s+log", r"@paypal\.com"],
    },
    BrandSignature {
        name: "chase",
        colors: &["#117ACA", "#005CB9"],
        keywords: &["chase", "jpmorgan", "bank", "sign in"],
        patterns: &[r"chase\s+bank", r"chase\s+online", r"jpmorgan\s+chase"],
    },
    BrandSignature {
        name: "bankofamerica",
        colors: &["#012169", "#E31837"],
        keywords: &["bank of america", "bofa", "online banking"],
        patterns: &[r"bank\s+of\s+america", r"bofa\s+online"],
    },
    BrandSignature {
        name: "wellsfargo",
        colors: &["#D71E28", "#FFCD41"],
        keywords: &["wells fargo", "banking", "sign on"],
        patterns: &[r"wells\s+fargo", r"wellsfargo\s+online"],
    },
    BrandSignature {
        name: "outlook",
        colors: &["#0078D4", "#106EBE"],
        keywords: &["outlook", "hotmail", "live", "sign in"],
        patterns: &[r"outlook\s+sign", r"@outlook\.com", r"@hotmail\.com"],
    },
    BrandSignature {
        name: "yahoo",
        colors: &["#5F01D1", "#720E9E"],
        keywords: &["yahoo", "mail", "sign in"],
        patterns: &[r"yahoo\s+mail", r"@yahoo\.com", r"yahoo\s+account"],
    },
    BrandSignature {
        name: "linkedin",
        colors: &["#0A66C2", "#0077B5"],
        keywords: &["linkedin", "professional network", "sign in"],
        patterns: &[r"linkedin\s+sign", r"@linkedin\.com"],
    },
    BrandSignature {
        name: "twitter",
        colors: &["#1DA1F2", "#14171A"],
        keywords: &["twitter", "tweet", "log in"],
        patterns: &[r"twitter\s+log", r"@twitter\.com"],
    },
    BrandSignature {
        name: "instagram",
        colors: &["#E4405F", "#833AB4", "#FD1D1D", "#F77737"],
        keywords: &["instagram", "insta", "log in"],
        patterns: &[r"instagram\s+log", r"@instagram\.com"],
    },
    BrandSignature {
        name: "ebay",
        colors: &["#E53238", "#F5AF02", "#86B817", "#0064D2"],
        keywords: &["ebay", "buy", "sell", "sign in"],
        patterns: &[r"ebay\s+sign", r"@ebay\.com"],
    },
    BrandSignature {
        name: "walmart",
        colors: &["#0071CE", "#FFC220"],
        keywords: &["walmart", "shop", "sign in"],
        patterns: &[r"walmart\s+account", r"walmart\s+online"],
    },
    BrandSignature {
        name: "coinbase",
        colors: &["#0052FF", "#1652F0"],
        keywords: &["coinbase", "crypto", "bitcoin", "sign in"],
        patterns: &[r"coinbase\s+sign", r"coinbase\s+wallet"],
    },
    BrandSignature {
        name: "binance",
        colors: &["#F3BA2F", "#FCD535"],
        keywords: &["binance", "crypto", "trading", "log in"],
        patterns: &[r"binance\s+log", r"binance\s+account"],
    },
];

/// Outcome of brand-impersonation detection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpersonationReport {
    pub is_impersonating: bool,
    /// 0-100 fused content/palette/domain score
    pub score: u32,
    pub suspected_brand: Option<String>,
    pub confidence: f64,
    /// Up to five indicator strings, strongest brand only
    pub indicators: Vec<String>,
}

/// Detects pages dressed up as a known brand on an unrelated domain
pub struct BrandImpersonationDetector {
    compiled: Vec<Vec<Regex>>,
}

impl BrandImpersonationDetector {
    pub fn new() -> Self {
        let compiled = SIGNATURES
            .iter()
            .map(|sig| {
                sig.patterns
                    .iter()
                    .filter_map(|p| match Regex::new(&format!("(?i){p}")) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!(brand = sig.name, pattern = p, "invalid signature pattern: {e}");
                            None
                        }
                    })
                    .collect()
            })
            .collect();
        Self { compiled }
    }

    /// Score the supplied page context against every brand signature
    pub fn detect(
        &self,
        url: &str,
        page_title: Option<&str>,
        page_text: Option<&str>,
        css_colors: Option<&[String]>,
    ) -> ImpersonationReport {
        let Some(parts) = parse_parts(url) else {
            return ImpersonationReport::default();
        };
        let domain = parts.label.to_lowercase();
        let full_domain = parts.registrable_domain.to_lowercase();

        let combined_text = [page_title.unwrap_or(""), page_text.unwrap_or(""), url]
            .join(" ")
            .to_lowercase();
        let normalized_colors: Vec<String> = css_colors
            .unwrap_or(&[])
            .iter()
            .map(|c| c.to_uppercase())
            .collect();

        let mut best_score = 0u32;
        let mut suspected: Option<&'static str> = None;
        let mut best_indicators: Vec<String> = Vec::new();

        for (sig, patterns) in SIGNATURES.iter().zip(&self.compiled) {
            // The legitimate site mentions its own brand; skip it
            if domain.contains(sig.name) {
                continue;
            }

            let mut score = 0u32;
            let mut indicators = Vec::new();

            let keyword_matches = sig
                .keywords
                .iter()
                .filter(|kw| combined_text.contains(&kw.to_lowercase()))
                .count();
            for kw in sig.keywords.iter().filter(|kw| combined_text.contains(&kw.to_lowercase())) {
                indicators.push(format!("Contains '{kw}' keyword"));
            }
            if keyword_matches >= 2 {
                score += 30;
            }

            let pattern_matches = patterns.iter().filter(|re| re.is_match(&combined_text)).count();
            if pattern_matches >= 1 {
                score += 25;
                indicators.push(format!("Matches {} pattern", sig.name));
            }

            if !normalized_colors.is_empty() {
                let color_matches = sig
                    .colors
                    .iter()
                    .filter(|c| normalized_colors.contains(&c.to_uppercase()))
                    .count();
                if color_matches >= 2 {
                    score += 20;
                    indicators.push(format!(
                        "Uses {}'s color scheme ({} colors matched)",
                        sig.name, color_matches
                    ));
                }
            }

            if let Some(title) = page_title {
                let title_lower = title.to_lowercase();
                if sig.keywords.iter().take(3).any(|kw| title_lower.contains(&kw.to_lowercase())) {
                    score += 15;
                    indicators.push(format!("Page title references {}", sig.name));
                }
            }

            let domain_distance = strsim::levenshtein(&domain, sig.name);
            if domain_distance > 3 {
                score += 10;
                indicators.push(format!(
                    "Domain doesn't match {} (distance: {})",
                    sig.name, domain_distance
                ));
            }

            if score > best_score && score >= IMPERSONATION_THRESHOLD {
                best_score = score;
                suspected = Some(sig.name);
                best_indicators = indicators;
            }
        }

        let score = best_score.min(100);
        let confidence = (score as f64 / 100.0).min(0.95);
        let is_impersonating = suspected
            .map(|brand| score >= IMPERSONATION_THRESHOLD && !full_domain.contains(brand))
            .unwrap_or(false);

        best_indicators.truncate(5);

        debug!(
            url,
            brand = suspected.unwrap_or("-"),
            score,
            "brand impersonation detection"
        );

        ImpersonationReport {
            is_impersonating,
            score,
            suspected_brand: suspected.map(|b| b.to_string()),
            confidence: (confidence * 100.0).round() / 100.0,
            indicators: best_indicators,
        }
    }

    /// Brands covered by the signature set
    pub fn supported_brands(&self) -> Vec<&'static str> {
        SIGNATURES.iter().map(|s| s.name).collect()
    }
}

impl Default for BrandImpersonationDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> BrandImpersonationDetector {
        BrandImpersonationDetector::new()
    }

    #[test]
    fn fake_login_page_with_brand_palette_is_flagged() {
        let colors = vec!["#003087".to_string(), "#009CDE".to_string()];
        let report = detector().detect(
            "https://secure-account-check.com/login",
            Some("PayPal Log In"),
            Some("Log in to your PayPal account to send money"),
            Some(&colors),
        );
        assert!(report.is_impersonating);
        assert_eq!(report.suspected_brand.as_deref(), Some("paypal"));
        // keywords + pattern + palette + title + domain distance all fire
        assert!(report.score >= 80, "score was {}", report.score);
        assert!(report.confidence > 0.5);
        assert!(report.indicators.len() <= 5);
    }

    #[test]
    fn legitimate_domain_is_skipped() {
        let report = detector().detect(
            "https://paypal.com/signin",
            Some("PayPal Log In"),
            Some("Log in to your PayPal account"),
            None,
        );
        assert!(!report.is_impersonating);
        assert_ne!(report.suspected_brand.as_deref(), Some("paypal"));
    }

    #[test]
    fn weak_signals_stay_below_threshold() {
        let report = detector().detect(
            "https://example.com/",
            Some("Welcome"),
            Some("A page about gardening"),
            None,
        );
        assert!(!report.is_impersonating);
        assert_eq!(report.score, 0);
        assert!(report.suspected_brand.is_none());
    }

    #[test]
    fn no_palette_means_no_color_contribution() {
        let with_colors = vec!["#1877F2".to_string(), "#4267B2".to_string()];
        let flagged = detector().detect(
            "https://account-restore.net/",
            Some("Facebook Log In"),
            Some("log in to facebook to continue"),
            Some(&with_colors),
        );
        let plain = detector().detect(
            "https://account-restore.net/",
            Some("Facebook Log In"),
            Some("log in to facebook to continue"),
            None,
        );
        assert!(flagged.score > plain.score);
    }

    #[test]
    fn indicators_are_capped_at_five() {
        let colors = vec!["#4285F4".to_string(), "#EA4335".to_string()];
        let report = detector().detect(
            "https://signin-helper.org/",
            Some("Google Account Sign In"),
            Some("google account gmail sign in account recovery"),
            Some(&colors),
        );
        assert!(report.indicators.len() <= 5);
    }
}
