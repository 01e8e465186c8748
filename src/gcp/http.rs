//! HTTP utilities for GCP REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// A non-success response from a GCP API
#[derive(Debug, Error)]
#[error("API request failed: {status}{}", message_suffix(.message))]
pub struct ApiError {
    pub status: StatusCode,
    /// `error.message` from the response body, when present
    pub message: Option<String>,
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(" ({})", m),
        None => String::new(),
    }
}

impl ApiError {
    fn from_body(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(|m| m.chars().take(MAX_LOG_BODY_LENGTH).collect())
            });
        Self { status, message }
    }

    /// Rate limiting and transient server errors
    pub fn is_retryable(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS || self.status.is_server_error()
    }
}

/// Truncate long bodies and strip control characters before logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", cut, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gcp-inventory/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send request")?;

        let body = read_body(response).await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }

    /// Upload raw bytes with a POST request
    pub async fn post_bytes(
        &self,
        url: &str,
        token: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Value> {
        tracing::debug!("POST {} ({} bytes)", url, bytes.len());

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .context("Failed to send request")?;

        let body = read_body(response).await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read response body")?;

    if !status.is_success() {
        tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
        return Err(ApiError::from_body(status, &body).into());
    }

    Ok(body)
}

/// Format a GCP API error for the run summary
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    if let Some(api) = error.chain().find_map(|e| e.downcast_ref::<ApiError>()) {
        let hint = match api.status.as_u16() {
            403 => "Permission denied or API not enabled",
            401 => "Authentication failed",
            404 => "Not found",
            429 => "Rate limit exceeded",
            400 => "Invalid request",
            409 => "Conflict",
            500..=599 => "GCP service temporarily unavailable",
            _ => "Request failed",
        };
        return match &api.message {
            Some(message) => format!("{} ({}): {}", hint, api.status.as_u16(), message),
            None => format!("{} ({})", hint, api.status.as_u16()),
        };
    }

    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_reads_message() {
        let body = r#"{"error":{"code":403,"message":"Cloud Asset API has not been used"}}"#;
        let err = ApiError::from_body(StatusCode::FORBIDDEN, body);
        assert_eq!(err.message.as_deref(), Some("Cloud Asset API has not been used"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(ApiError::from_body(StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(ApiError::from_body(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(!ApiError::from_body(StatusCode::NOT_FOUND, "").is_retryable());
    }

    #[test]
    fn test_format_gcp_error_permission_denied() {
        let err = anyhow::Error::new(ApiError::from_body(StatusCode::FORBIDDEN, "not json"));
        assert_eq!(
            format_gcp_error(&err),
            "Permission denied or API not enabled (403)"
        );
    }

    #[test]
    fn test_format_gcp_error_truncates_plain_errors() {
        let long = "x".repeat(500);
        let formatted = format_gcp_error(&anyhow::anyhow!(long));
        assert!(formatted.ends_with("..."));
        assert_eq!(formatted.len(), 163);
    }

    #[test]
    fn test_sanitize_for_log_truncates() {
        let body = "a".repeat(300);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("[truncated, 300 bytes total]"));
    }
}
