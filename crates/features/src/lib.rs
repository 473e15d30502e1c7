//! URL feature extraction
//!
//! Turns a submitted URL into the fixed numeric feature record shared with
//! the ML collaborator, plus the parsed domain parts the other detectors
//! work from. Lexical features are pure string functions; the TLS and WHOIS
//! probes are best-effort and degrade to sentinel values on any failure.

pub mod probes;

use chrono::Utc;
use phishlens_config::ProbeSettings;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// TLDs disproportionately used for throwaway phishing domains
pub const SUSPICIOUS_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "work", "click", "link", "stream", "download",
    "loan", "win",
];

/// Credential-harvesting vocabulary checked against the whole URL
pub const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "verify", "account", "update", "secure", "banking", "confirm", "login", "signin", "password",
    "urgent", "suspended", "locked", "validate", "restore", "limited", "unusual", "activity",
];

/// Canonical feature order for the ML input vector.
///
/// Fixed at compile time and shared with the model crate; both sides index
/// into vectors produced by [`UrlFeatures::to_vector`], so the order here is
/// load-bearing and append-only.
pub const FEATURE_ORDER: &[&str] = &[
    "url_length",
    "domain_length",
    "path_length",
    "subdomain_length",
    "subdomain_count",
    "path_depth",
    "query_param_count",
    "digit_count",
    "letter_count",
    "special_char_count",
    "hyphen_count",
    "underscore_count",
    "dot_count",
    "slash_count",
    "at_symbol",
    "digit_ratio",
    "special_char_ratio",
    "url_entropy",
    "domain_entropy",
    "has_ip_address",
    "has_suspicious_tld",
    "suspicious_keyword_count",
    "has_double_slash_redirecting",
    "prefix_suffix_in_domain",
    "uses_non_standard_port",
    "port",
    "is_https",
    "has_valid_ssl",
    "ssl_certificate_age_days",
    "ssl_issuer_trusted",
    "domain_age_days",
    "domain_registered_recently",
];

/// Fixed numeric feature record for one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlFeatures {
    pub url_length: u32,
    pub domain_length: u32,
    pub path_length: u32,
    pub subdomain_length: u32,
    pub subdomain_count: u32,
    pub path_depth: u32,
    pub query_param_count: u32,
    pub digit_count: u32,
    pub letter_count: u32,
    pub special_char_count: u32,
    pub hyphen_count: u32,
    pub underscore_count: u32,
    pub dot_count: u32,
    pub slash_count: u32,
    pub at_symbol: u8,
    pub digit_ratio: f64,
    pub special_char_ratio: f64,
    pub url_entropy: f64,
    pub domain_entropy: f64,
    pub has_ip_address: u8,
    pub has_suspicious_tld: u8,
    pub suspicious_keyword_count: u32,
    pub has_double_slash_redirecting: u8,
    pub prefix_suffix_in_domain: u8,
    pub uses_non_standard_port: u8,
    pub port: u16,
    pub is_https: u8,
    /// 1 when the TLS handshake completed and a peer certificate was read
    pub has_valid_ssl: u8,
    /// Days since the certificate's notBefore, -1 when unknown
    pub ssl_certificate_age_days: i64,
    /// 1 when the certificate is older than 30 days
    pub ssl_issuer_trusted: u8,
    /// Days since domain registration, -1 when unknown
    pub domain_age_days: i64,
    /// 1 when the domain is younger than 180 days
    pub domain_registered_recently: u8,
}

impl UrlFeatures {
    /// Flatten into the ML input vector, in [`FEATURE_ORDER`]
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.url_length as f64,
            self.domain_length as f64,
            self.path_length as f64,
            self.subdomain_length as f64,
            self.subdomain_count as f64,
            self.path_depth as f64,
            self.query_param_count as f64,
            self.digit_count as f64,
            self.letter_count as f64,
            self.special_char_count as f64,
            self.hyphen_count as f64,
            self.underscore_count as f64,
            self.dot_count as f64,
            self.slash_count as f64,
            self.at_symbol as f64,
            self.digit_ratio,
            self.special_char_ratio,
            self.url_entropy,
            self.domain_entropy,
            self.has_ip_address as f64,
            self.has_suspicious_tld as f64,
            self.suspicious_keyword_count as f64,
            self.has_double_slash_redirecting as f64,
            self.prefix_suffix_in_domain as f64,
            self.uses_non_standard_port as f64,
            self.port as f64,
            self.is_https as f64,
            self.has_valid_ssl as f64,
            self.ssl_certificate_age_days as f64,
            self.ssl_issuer_trusted as f64,
            self.domain_age_days as f64,
            self.domain_registered_recently as f64,
        ]
    }
}

/// Parsed URL components used by the detectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
    /// Registrable domain, e.g. `example.co.uk`
    pub registrable_domain: String,
    /// Label directly under the public suffix, e.g. `example`
    pub label: String,
    /// Public suffix, e.g. `co.uk`
    pub suffix: String,
    /// Everything left of the registrable domain, e.g. `a.b`
    pub subdomain: String,
}

/// Split a URL into scheme/host/port/path plus public-suffix-aware domain parts.
///
/// Hosts that are IP addresses (or otherwise have no public suffix) keep the
/// whole host as the label with empty suffix and subdomain.
pub fn parse_parts(raw: &str) -> Option<UrlParts> {
    let parsed = url::Url::parse(raw).ok()?;
    let host = parsed.host_str()?.to_lowercase();

    let (registrable, suffix) = match (psl::domain_str(&host), psl::suffix_str(&host)) {
        (Some(domain), Some(suffix)) => (domain.to_string(), suffix.to_string()),
        _ => (host.clone(), String::new()),
    };

    let label = match registrable.strip_suffix(&format!(".{suffix}")) {
        Some(label) if !suffix.is_empty() => label.to_string(),
        _ => registrable.clone(),
    };

    let subdomain = host
        .strip_suffix(&registrable)
        .map(|s| s.trim_end_matches('.').to_string())
        .unwrap_or_default();

    Some(UrlParts {
        scheme: parsed.scheme().to_string(),
        host,
        port: parsed.port(),
        path: parsed.path().to_string(),
        query: parsed.query().map(|q| q.to_string()),
        registrable_domain: registrable,
        label,
        suffix,
        subdomain,
    })
}

/// Shannon entropy (base 2) of the character distribution, rounded to 4 decimals
pub fn shannon_entropy(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in text.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    let len = text.chars().count() as f64;
    let mut entropy = 0.0;
    for &count in freq.values() {
        let p = count as f64 / len;
        entropy -= p * p.log2();
    }

    (entropy * 10_000.0).round() / 10_000.0
}

fn ipv4_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])",
        )
        .expect("ipv4 regex is valid")
    })
}

/// URL feature extractor
///
/// Lexical extraction is pure; [`FeatureExtractor::extract`] additionally runs
/// the TLS and WHOIS probes under their configured timeouts.
pub struct FeatureExtractor {
    probes: ProbeSettings,
}

impl FeatureExtractor {
    pub fn new(probes: ProbeSettings) -> Self {
        Self { probes }
    }

    /// Extract the full feature record, including the network-side probes
    pub async fn extract(&self, url: &str) -> UrlFeatures {
        let mut features = self.extract_lexical(url);

        let Some(parts) = parse_parts(url) else {
            return features;
        };

        if parts.scheme == "https" {
            let ssl = probes::tls_probe(&parts.host, self.probes.ssl_timeout()).await;
            features.has_valid_ssl = ssl.has_valid_ssl;
            features.ssl_certificate_age_days = ssl.certificate_age_days;
            features.ssl_issuer_trusted = ssl.issuer_trusted;
        }

        let whois = probes::whois_probe(&parts.registrable_domain, self.probes.whois_timeout()).await;
        features.domain_age_days = whois.age_days;
        features.domain_registered_recently = whois.registered_recently;

        debug!(
            url,
            ssl_age = features.ssl_certificate_age_days,
            domain_age = features.domain_age_days,
            "feature extraction complete"
        );

        features
    }

    /// Extract the lexical/structural features only; probe fields stay at sentinels
    pub fn extract_lexical(&self, url: &str) -> UrlFeatures {
        let parts = parse_parts(url);
        let label = parts.as_ref().map(|p| p.label.as_str()).unwrap_or("");
        let subdomain = parts.as_ref().map(|p| p.subdomain.as_str()).unwrap_or("");
        let suffix = parts.as_ref().map(|p| p.suffix.as_str()).unwrap_or("");
        let path = parts.as_ref().map(|p| p.path.as_str()).unwrap_or("");
        let scheme = parts.as_ref().map(|p| p.scheme.as_str()).unwrap_or("");

        let url_lower = url.to_lowercase();
        let char_count = url.chars().count() as u32;
        let digit_count = url.chars().filter(|c| c.is_ascii_digit()).count() as u32;
        let letter_count = url.chars().filter(|c| c.is_alphabetic()).count() as u32;
        let special_char_count = url.chars().filter(|c| !c.is_alphanumeric()).count() as u32;

        let explicit_port = parts.as_ref().and_then(|p| p.port);
        let port = explicit_port.unwrap_or(if scheme == "https" { 443 } else { 80 });
        let uses_non_standard_port = match explicit_port {
            Some(p) if ![80, 443, 8080].contains(&p) => 1,
            _ => 0,
        };

        UrlFeatures {
            url_length: char_count,
            domain_length: label.chars().count() as u32,
            path_length: path.chars().count() as u32,
            subdomain_length: subdomain.chars().count() as u32,
            subdomain_count: if subdomain.is_empty() {
                0
            } else {
                subdomain.split('.').count() as u32
            },
            path_depth: path.split('/').filter(|s| !s.is_empty()).count() as u32,
            query_param_count: parts
                .as_ref()
                .and_then(|p| p.query.as_deref())
                .map(|q| q.split('&').filter(|s| !s.is_empty()).count() as u32)
                .unwrap_or(0),
            digit_count,
            letter_count,
            special_char_count,
            hyphen_count: url.matches('-').count() as u32,
            underscore_count: url.matches('_').count() as u32,
            dot_count: url.matches('.').count() as u32,
            slash_count: url.matches('/').count() as u32,
            at_symbol: u8::from(url.contains('@')),
            digit_ratio: safe_ratio(digit_count, char_count),
            special_char_ratio: safe_ratio(special_char_count, char_count),
            url_entropy: shannon_entropy(url),
            domain_entropy: shannon_entropy(label),
            has_ip_address: u8::from(ipv4_regex().is_match(url)),
            has_suspicious_tld: u8::from(SUSPICIOUS_TLDS.contains(&suffix)),
            suspicious_keyword_count: SUSPICIOUS_KEYWORDS
                .iter()
                .filter(|kw| url_lower.contains(*kw))
                .count() as u32,
            has_double_slash_redirecting: u8::from(url.matches("//").count() > 1),
            prefix_suffix_in_domain: u8::from(label.contains('-')),
            uses_non_standard_port,
            port,
            is_https: u8::from(scheme == "https"),
            has_valid_ssl: 0,
            ssl_certificate_age_days: -1,
            ssl_issuer_trusted: 0,
            domain_age_days: -1,
            domain_registered_recently: 0,
        }
    }
}

fn safe_ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    ((numerator as f64 / denominator as f64) * 10_000.0).round() / 10_000.0
}

/// Days elapsed since a UTC timestamp, for probe age math
pub(crate) fn days_since(timestamp_secs: i64) -> i64 {
    let now = Utc::now().timestamp();
    (now - timestamp_secs) / 86_400
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(ProbeSettings {
            ssl_timeout_secs: 2,
            whois_timeout_secs: 5,
        })
    }

    #[test]
    fn parses_registrable_domain_parts() {
        let parts = parse_parts("https://mail.accounts.example.co.uk/inbox?x=1").unwrap();
        assert_eq!(parts.registrable_domain, "example.co.uk");
        assert_eq!(parts.label, "example");
        assert_eq!(parts.suffix, "co.uk");
        assert_eq!(parts.subdomain, "mail.accounts");
        assert_eq!(parts.host, "mail.accounts.example.co.uk");
    }

    #[test]
    fn empty_subdomain_yields_zero_counts() {
        let f = extractor().extract_lexical("https://example.com/login");
        assert_eq!(f.subdomain_count, 0);
        assert_eq!(f.subdomain_length, 0);
    }

    #[test]
    fn ip_host_keeps_whole_host_as_label() {
        let parts = parse_parts("http://192.168.14.22:8081/login?user=admin").unwrap();
        assert_eq!(parts.label, "192.168.14.22");
        assert_eq!(parts.suffix, "");
        assert_eq!(parts.subdomain, "");
    }

    #[test]
    fn entropy_matches_known_values() {
        // Uniform two-symbol string has exactly 1 bit per symbol
        assert_eq!(shannon_entropy("abab"), 1.0);
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("aaaa"), 0.0);
        assert!(shannon_entropy("abcdefgh") > shannon_entropy("aabbccdd"));
    }

    #[test]
    fn ipv4_detection_is_strict() {
        let e = extractor();
        assert_eq!(e.extract_lexical("http://192.168.14.22/x").has_ip_address, 1);
        assert_eq!(e.extract_lexical("http://999.1.1.1/x").has_ip_address, 0);
        assert_eq!(e.extract_lexical("https://example.com/a").has_ip_address, 0);
    }

    #[test]
    fn suspicious_tld_and_keywords() {
        let e = extractor();
        let f = e.extract_lexical("https://microsoft-account-verify-update.tk/signin");
        assert_eq!(f.has_suspicious_tld, 1);
        // verify, account, update, signin
        assert_eq!(f.suspicious_keyword_count, 4);
        assert_eq!(f.prefix_suffix_in_domain, 1);

        let clean = e.extract_lexical("https://example.com/");
        assert_eq!(clean.has_suspicious_tld, 0);
        assert_eq!(clean.suspicious_keyword_count, 0);
    }

    #[test]
    fn port_features() {
        let e = extractor();
        let f = e.extract_lexical("http://192.168.14.22:8081/login");
        assert_eq!(f.uses_non_standard_port, 1);
        assert_eq!(f.port, 8081);

        let f = e.extract_lexical("http://example.com:8080/");
        assert_eq!(f.uses_non_standard_port, 0);
        assert_eq!(f.port, 8080);

        let f = e.extract_lexical("https://example.com/");
        assert_eq!(f.uses_non_standard_port, 0);
        assert_eq!(f.port, 443);
    }

    #[test]
    fn double_slash_and_at_symbol() {
        let e = extractor();
        assert_eq!(
            e.extract_lexical("https://example.com/a//b").has_double_slash_redirecting,
            1
        );
        assert_eq!(
            e.extract_lexical("https://example.com/a/b").has_double_slash_redirecting,
            0
        );
        assert_eq!(e.extract_lexical("https://user@example.com/").at_symbol, 1);
    }

    #[test]
    fn probe_fields_default_to_sentinels() {
        let f = extractor().extract_lexical("https://example.com/");
        assert_eq!(f.has_valid_ssl, 0);
        assert_eq!(f.ssl_certificate_age_days, -1);
        assert_eq!(f.domain_age_days, -1);
        assert_eq!(f.domain_registered_recently, 0);
    }

    #[test]
    fn vector_order_matches_feature_order() {
        let f = extractor().extract_lexical("https://example.com/login?a=1&b=2");
        let v = f.to_vector();
        assert_eq!(v.len(), FEATURE_ORDER.len());
        let idx = |name: &str| FEATURE_ORDER.iter().position(|n| *n == name).unwrap();
        assert_eq!(v[idx("url_length")], f.url_length as f64);
        assert_eq!(v[idx("query_param_count")], 2.0);
        assert_eq!(v[idx("is_https")], 1.0);
        assert_eq!(v[idx("ssl_certificate_age_days")], -1.0);
    }
}
