//! Network-side feature probes
//!
//! Both probes are best-effort: any connect, handshake, parse, or timeout
//! failure leaves the sentinel values in place and never surfaces an error
//! to the extraction path.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::*;

use crate::days_since;

/// Outcome of the TLS probe, sentinel-valued on failure
#[derive(Debug, Clone, Copy)]
pub struct SslInfo {
    pub has_valid_ssl: u8,
    pub certificate_age_days: i64,
    pub issuer_trusted: u8,
}

impl Default for SslInfo {
    fn default() -> Self {
        Self {
            has_valid_ssl: 0,
            certificate_age_days: -1,
            issuer_trusted: 0,
        }
    }
}

/// Outcome of the WHOIS probe, sentinel-valued on failure
#[derive(Debug, Clone, Copy)]
pub struct WhoisInfo {
    pub age_days: i64,
    pub registered_recently: u8,
}

impl Default for WhoisInfo {
    fn default() -> Self {
        Self {
            age_days: -1,
            registered_recently: 0,
        }
    }
}

fn tls_connector() -> &'static TlsConnector {
    static CONNECTOR: OnceLock<TlsConnector> = OnceLock::new();
    CONNECTOR.get_or_init(|| {
        let mut roots = RootCertStore::empty();
        roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));
        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();
        TlsConnector::from(Arc::new(config))
    })
}

/// Handshake with `host:443` and read the peer certificate's notBefore.
///
/// A certificate younger than 30 days keeps `issuer_trusted` at 0.
pub async fn tls_probe(host: &str, timeout: Duration) -> SslInfo {
    match tokio::time::timeout(timeout, tls_probe_inner(host)).await {
        Ok(Some(info)) => info,
        Ok(None) => {
            debug!(host, "TLS probe failed");
            SslInfo::default()
        }
        Err(_) => {
            debug!(host, "TLS probe timed out");
            SslInfo::default()
        }
    }
}

async fn tls_probe_inner(host: &str) -> Option<SslInfo> {
    let server_name = ServerName::try_from(host).ok()?;
    let tcp = TcpStream::connect((host, 443)).await.ok()?;
    let tls = tls_connector().connect(server_name, tcp).await.ok()?;

    let (_, connection) = tls.get_ref();
    let cert = connection.peer_certificates()?.first()?;
    let (_, parsed) = X509Certificate::from_der(&cert.0).ok()?;

    let not_before = parsed.validity().not_before.timestamp();
    let age_days = days_since(not_before).max(0);

    Some(SslInfo {
        has_valid_ssl: 1,
        certificate_age_days: age_days,
        issuer_trusted: u8::from(age_days > 30),
    })
}

/// Query WHOIS for the registrable domain and derive its registration age.
///
/// Follows the IANA referral to the registry server and takes the earliest
/// creation date when several are reported. A domain younger than 180 days
/// sets `registered_recently`.
pub async fn whois_probe(domain: &str, timeout: Duration) -> WhoisInfo {
    match tokio::time::timeout(timeout, whois_probe_inner(domain)).await {
        Ok(Some(info)) => info,
        Ok(None) => {
            debug!(domain, "WHOIS probe failed");
            WhoisInfo::default()
        }
        Err(_) => {
            debug!(domain, "WHOIS probe timed out");
            WhoisInfo::default()
        }
    }
}

async fn whois_probe_inner(domain: &str) -> Option<WhoisInfo> {
    let referral = whois_query("whois.iana.org", domain).await.ok()?;
    let server = referral
        .lines()
        .find_map(|line| {
            let line = line.trim();
            line.strip_prefix("refer:")
                .or_else(|| line.strip_prefix("whois:"))
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())?;

    let record = whois_query(&server, domain).await.ok()?;
    let created = earliest_creation_date(&record)?;
    let age_days = days_since(created).max(0);

    Some(WhoisInfo {
        age_days,
        registered_recently: u8::from(age_days < 180),
    })
}

async fn whois_query(server: &str, query: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect((server, 43)).await?;
    stream.write_all(format!("{query}\r\n").as_bytes()).await?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(String::from_utf8_lossy(&response).into_owned())
}

fn creation_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?im)^\s*(?:creation date|created(?: on)?|registered(?: on)?|registration(?: time| date)?|domain record activated)\s*[:.]?\s*(\S.*)$",
        )
        .expect("creation date regex is valid")
    })
}

/// Earliest creation timestamp (unix seconds) found in a WHOIS record
pub(crate) fn earliest_creation_date(record: &str) -> Option<i64> {
    creation_date_regex()
        .captures_iter(record)
        .filter_map(|caps| parse_whois_date(caps.get(1)?.as_str().trim()))
        .min()
}

fn parse_whois_date(raw: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }

    // Registries disagree on date formats; try the common ones in turn
    let date_only = raw.split_whitespace().next()?;
    let formats = ["%Y-%m-%d", "%d-%b-%Y", "%Y.%m.%d", "%d.%m.%Y", "%Y/%m/%d"];
    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(date_only, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
        }
    }
    None
}
