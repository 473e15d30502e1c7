//! API request/response models

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// URL analysis submission
#[derive(Debug, Clone, Deserialize)]
pub struct UrlAnalysisRequest {
    pub url: String,
    pub page_title: Option<String>,
    pub page_text: Option<String>,
    pub css_colors: Option<Vec<String>>,
    /// Opaque caller identifier, logged only
    pub user_id: Option<String>,
}

impl UrlAnalysisRequest {
    /// Validate shape before any analyzer runs
    pub fn validate(&self) -> Result<(), String> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err("URL must start with http:// or https://".to_string());
        }
        let len = self.url.chars().count();
        if !(10..=2048).contains(&len) {
            return Err("URL length must be between 10 and 2048 characters".to_string());
        }
        Ok(())
    }
}

/// Health check payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub cache: phishlens_cache::backend::BackendStats,
    pub ml_primary_loaded: bool,
    pub feed_size: usize,
}

/// Uniform error body surfaced to callers
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: &'static str,
    pub message: String,
    pub path: String,
    pub timestamp: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl ApiError {
    pub fn invalid_request(message: String, path: &str) -> Self {
        Self {
            error: "invalid_request",
            message,
            path: path.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn analysis_failed(message: String, path: &str) -> Self {
        Self {
            error: "analysis_failed",
            message,
            path: path.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> UrlAnalysisRequest {
        UrlAnalysisRequest {
            url: url.to_string(),
            page_title: None,
            page_text: None,
            css_colors: None,
            user_id: None,
        }
    }

    #[test]
    fn accepts_well_formed_urls() {
        assert!(request("https://example.com/login").validate().is_ok());
        assert!(request("http://example.io").validate().is_ok());
    }

    #[test]
    fn rejects_bad_scheme_and_bad_length() {
        assert!(request("ftp://example.com/file").validate().is_err());
        assert!(request("http://a").validate().is_err());
        let oversized = format!("https://example.com/{}", "a".repeat(2048));
        assert!(request(&oversized).validate().is_err());
    }

    #[test]
    fn error_body_serialises_without_status() {
        let e = ApiError::invalid_request("bad".to_string(), "/api/v1/analyze/url");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["error"], "invalid_request");
        assert!(json.get("status").is_none());
    }
}
