//! Heuristic threat scoring
//!
//! A fixed table of rules evaluated independently over the feature record.
//! The table is plain data (signal + comparison + weight) interpreted by a
//! single evaluator, so a rule can never carry behavior of its own. Matched
//! rule weights accumulate and the total clamps at 100 — heuristics are
//! expected to saturate on severely malicious URLs.

use phishlens_features::UrlFeatures;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Severity tag attached to each rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Numeric signal a rule reads from the feature record
#[derive(Debug, Clone, Copy)]
enum Signal {
    UrlLength,
    DomainLength,
    SubdomainCount,
    PathDepth,
    QueryParamCount,
    DigitRatio,
    SpecialCharRatio,
    HyphenCount,
    UrlEntropy,
    DomainEntropy,
    HasIpAddress,
    HasSuspiciousTld,
    SuspiciousKeywordCount,
    AtSymbol,
    DoubleSlash,
    PrefixSuffixInDomain,
    NonStandardPort,
    IsHttps,
    HasValidSsl,
    SslCertificateAgeDays,
    DomainAgeDays,
    DomainRegisteredRecently,
}

impl Signal {
    fn read(self, f: &UrlFeatures) -> f64 {
        match self {
            Signal::UrlLength => f.url_length as f64,
            Signal::DomainLength => f.domain_length as f64,
            Signal::SubdomainCount => f.subdomain_count as f64,
            Signal::PathDepth => f.path_depth as f64,
            Signal::QueryParamCount => f.query_param_count as f64,
            Signal::DigitRatio => f.digit_ratio,
            Signal::SpecialCharRatio => f.special_char_ratio,
            Signal::HyphenCount => f.hyphen_count as f64,
            Signal::UrlEntropy => f.url_entropy,
            Signal::DomainEntropy => f.domain_entropy,
            Signal::HasIpAddress => f.has_ip_address as f64,
            Signal::HasSuspiciousTld => f.has_suspicious_tld as f64,
            Signal::SuspiciousKeywordCount => f.suspicious_keyword_count as f64,
            Signal::AtSymbol => f.at_symbol as f64,
            Signal::DoubleSlash => f.has_double_slash_redirecting as f64,
            Signal::PrefixSuffixInDomain => f.prefix_suffix_in_domain as f64,
            Signal::NonStandardPort => f.uses_non_standard_port as f64,
            Signal::IsHttps => f.is_https as f64,
            Signal::HasValidSsl => f.has_valid_ssl as f64,
            Signal::SslCertificateAgeDays => f.ssl_certificate_age_days as f64,
            Signal::DomainAgeDays => f.domain_age_days as f64,
            Signal::DomainRegisteredRecently => f.domain_registered_recently as f64,
        }
    }
}

/// Data-driven rule predicate
#[derive(Debug, Clone, Copy)]
enum Predicate {
    /// signal > threshold
    Above(Signal, f64),
    /// signal >= threshold
    AtLeast(Signal, f64),
    /// signal == value
    Equals(Signal, f64),
    /// lo <= signal < hi
    Between(Signal, f64, f64),
    /// both signals equal their values
    EqualsBoth(Signal, f64, Signal, f64),
}

impl Predicate {
    fn matches(self, f: &UrlFeatures) -> bool {
        match self {
            Predicate::Above(s, threshold) => s.read(f) > threshold,
            Predicate::AtLeast(s, threshold) => s.read(f) >= threshold,
            Predicate::Equals(s, value) => s.read(f) == value,
            Predicate::Between(s, lo, hi) => {
                let v = s.read(f);
                v >= lo && v < hi
            }
            Predicate::EqualsBoth(a, av, b, bv) => a.read(f) == av && b.read(f) == bv,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Explanation {
    Fixed(&'static str),
    /// Expanded with the suspicious-keyword count
    KeywordCount,
}

impl Explanation {
    fn render(self, f: &UrlFeatures) -> String {
        match self {
            Explanation::Fixed(text) => text.to_string(),
            Explanation::KeywordCount => format!(
                "Contains {} phishing-related keywords",
                f.suspicious_keyword_count
            ),
        }
    }
}

struct Rule {
    name: &'static str,
    predicate: Predicate,
    weight: u32,
    severity: Severity,
    explanation: Explanation,
}

// Rules deliberately overlap: a hostile URL is expected to trip several.
const RULES: &[Rule] = &[
    // Length
    Rule {
        name: "Extremely long URL",
        predicate: Predicate::Above(Signal::UrlLength, 75.0),
        weight: 15,
        severity: Severity::Medium,
        explanation: Explanation::Fixed("URL length exceeds 75 characters (common in phishing)"),
    },
    Rule {
        name: "Very long domain",
        predicate: Predicate::Above(Signal::DomainLength, 30.0),
        weight: 10,
        severity: Severity::Low,
        explanation: Explanation::Fixed("Domain name is unusually long"),
    },
    // Structure
    Rule {
        name: "Multiple subdomains",
        predicate: Predicate::AtLeast(Signal::SubdomainCount, 3.0),
        weight: 20,
        severity: Severity::High,
        explanation: Explanation::Fixed("Contains 3+ subdomains (obfuscation technique)"),
    },
    Rule {
        name: "Deep path structure",
        predicate: Predicate::Above(Signal::PathDepth, 5.0),
        weight: 12,
        severity: Severity::Medium,
        explanation: Explanation::Fixed("Path depth exceeds 5 levels (suspicious structure)"),
    },
    Rule {
        name: "Many query parameters",
        predicate: Predicate::Above(Signal::QueryParamCount, 10.0),
        weight: 8,
        severity: Severity::Low,
        explanation: Explanation::Fixed("Contains excessive query parameters"),
    },
    // Character patterns
    Rule {
        name: "High digit ratio",
        predicate: Predicate::Above(Signal::DigitRatio, 0.2),
        weight: 15,
        severity: Severity::Medium,
        explanation: Explanation::Fixed("Unusually high number of digits in URL"),
    },
    Rule {
        name: "High special character ratio",
        predicate: Predicate::Above(Signal::SpecialCharRatio, 0.3),
        weight: 12,
        severity: Severity::Medium,
        explanation: Explanation::Fixed("Excessive special characters detected"),
    },
    Rule {
        name: "Multiple hyphens in domain",
        predicate: Predicate::Above(Signal::HyphenCount, 3.0),
        weight: 15,
        severity: Severity::Medium,
        explanation: Explanation::Fixed("Domain contains multiple hyphens (typosquatting indicator)"),
    },
    // Entropy
    Rule {
        name: "High URL entropy",
        predicate: Predicate::Above(Signal::UrlEntropy, 4.5),
        weight: 18,
        severity: Severity::High,
        explanation: Explanation::Fixed("High entropy suggests randomly generated or obfuscated URL"),
    },
    Rule {
        name: "High domain entropy",
        predicate: Predicate::Above(Signal::DomainEntropy, 4.0),
        weight: 15,
        severity: Severity::Medium,
        explanation: Explanation::Fixed("Domain has high entropy (possibly DGA-generated)"),
    },
    // Suspicious patterns
    Rule {
        name: "IP address instead of domain",
        predicate: Predicate::Equals(Signal::HasIpAddress, 1.0),
        weight: 30,
        severity: Severity::Critical,
        explanation: Explanation::Fixed("Uses IP address instead of domain name"),
    },
    Rule {
        name: "Suspicious TLD",
        predicate: Predicate::Equals(Signal::HasSuspiciousTld, 1.0),
        weight: 20,
        severity: Severity::High,
        explanation: Explanation::Fixed("Uses commonly abused TLD (.tk, .ml, .xyz, etc.)"),
    },
    Rule {
        name: "Multiple suspicious keywords",
        predicate: Predicate::AtLeast(Signal::SuspiciousKeywordCount, 2.0),
        weight: 25,
        severity: Severity::High,
        explanation: Explanation::KeywordCount,
    },
    Rule {
        name: "At symbol in URL",
        predicate: Predicate::Equals(Signal::AtSymbol, 1.0),
        weight: 20,
        severity: Severity::High,
        explanation: Explanation::Fixed("@ symbol used for URL manipulation"),
    },
    Rule {
        name: "Double slash redirecting",
        predicate: Predicate::Equals(Signal::DoubleSlash, 1.0),
        weight: 18,
        severity: Severity::Medium,
        explanation: Explanation::Fixed("Multiple // detected (redirect obfuscation)"),
    },
    Rule {
        name: "Prefix/suffix in domain",
        predicate: Predicate::Equals(Signal::PrefixSuffixInDomain, 1.0),
        weight: 15,
        severity: Severity::Medium,
        explanation: Explanation::Fixed("Domain contains hyphens (brand imitation technique)"),
    },
    // Ports
    Rule {
        name: "Non-standard port",
        predicate: Predicate::Equals(Signal::NonStandardPort, 1.0),
        weight: 12,
        severity: Severity::Medium,
        explanation: Explanation::Fixed("Uses non-standard port number"),
    },
    // Transport security
    Rule {
        name: "No HTTPS",
        predicate: Predicate::Equals(Signal::IsHttps, 0.0),
        weight: 10,
        severity: Severity::Low,
        explanation: Explanation::Fixed("Not using secure HTTPS protocol"),
    },
    Rule {
        name: "Invalid or missing SSL",
        predicate: Predicate::EqualsBoth(Signal::HasValidSsl, 0.0, Signal::IsHttps, 1.0),
        weight: 25,
        severity: Severity::High,
        explanation: Explanation::Fixed("HTTPS but invalid/missing SSL certificate"),
    },
    Rule {
        name: "Very new SSL certificate",
        predicate: Predicate::Between(Signal::SslCertificateAgeDays, 0.0, 30.0),
        weight: 15,
        severity: Severity::Medium,
        explanation: Explanation::Fixed("SSL certificate issued less than 30 days ago"),
    },
    // Domain age
    Rule {
        name: "Recently registered domain",
        predicate: Predicate::Equals(Signal::DomainRegisteredRecently, 1.0),
        weight: 20,
        severity: Severity::High,
        explanation: Explanation::Fixed("Domain registered less than 6 months ago"),
    },
    Rule {
        name: "Very new domain",
        predicate: Predicate::Between(Signal::DomainAgeDays, 0.0, 30.0),
        weight: 30,
        severity: Severity::Critical,
        explanation: Explanation::Fixed("Domain registered less than 30 days ago"),
    },
];

/// One matched rule, explanation already expanded against feature values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedRule {
    pub name: String,
    pub score: u32,
    pub severity: Severity,
    pub explanation: String,
}

/// Result of evaluating the rule table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeuristicReport {
    /// Accumulated weight, clamped to 100
    pub score: u32,
    /// Matched rules, heaviest first (ties keep table order)
    pub matched_rules: Vec<MatchedRule>,
    pub rule_count: usize,
}

/// Evaluates the fixed rule table against a feature record
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, features: &UrlFeatures) -> HeuristicReport {
        let mut matched_rules = Vec::new();
        let mut total: u32 = 0;

        for rule in RULES {
            if rule.predicate.matches(features) {
                matched_rules.push(MatchedRule {
                    name: rule.name.to_string(),
                    score: rule.weight,
                    severity: rule.severity,
                    explanation: rule.explanation.render(features),
                });
                total += rule.weight;
            }
        }

        // Stable sort keeps table order for equal weights
        matched_rules.sort_by(|a, b| b.score.cmp(&a.score));

        let score = total.min(100);
        debug!(score, rules = matched_rules.len(), "heuristic evaluation");

        HeuristicReport {
            score,
            rule_count: matched_rules.len(),
            matched_rules,
        }
    }

    /// Number of rules in the table
    pub fn rule_count(&self) -> usize {
        RULES.len()
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new()
    }
}
