//! HTTP API client.
//!
//! Issues the outbound calls described by a step's `api` block. The
//! payload travels as query parameters on GET and as a JSON body on every
//! other method. A bearer token, when supplied, goes into the
//! `Authorization` header. Every request carries a timeout — a hung
//! backend must never hang a conversation worker.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// The HTTP status reserved for CSRF/session expiry.
pub const CSRF_EXPIRED_STATUS: u16 = 419;

/// Seam between the interpreter and the network.
///
/// [`ApiClient`] is the production implementation; engine tests substitute
/// a scripted stub.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Perform one API call and return the decoded JSON body.
    async fn invoke(
        &self,
        method: &str,
        url: &str,
        payload: &Value,
        token: Option<&str>,
    ) -> Result<Value>;
}

/// Production API client backed by [`reqwest`].
pub struct ApiClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("Colloquy/0.1")
            .build()
            .unwrap_or_default();

        Self { http, timeout }
    }

    /// Create a client with [`DEFAULT_TIMEOUT_SECS`].
    pub fn with_default_timeout() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::with_default_timeout()
    }
}

#[async_trait]
impl ApiTransport for ApiClient {
    async fn invoke(
        &self,
        method: &str,
        url: &str,
        payload: &Value,
        token: Option<&str>,
    ) -> Result<Value> {
        let method = parse_method(method)?;

        url::Url::parse(url).map_err(|e| GatewayError::InvalidRequest {
            reason: format!("invalid URL `{url}`: {e}"),
        })?;

        debug!(method = %method, url, "issuing API request");

        let mut request = self
            .http
            .request(method.clone(), url)
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        request = if method == Method::GET {
            request.query(&flatten_for_query(payload))
        } else {
            request.json(payload)
        };

        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            warn!(url, error = %e, "API request failed before a response");
            GatewayError::Transport {
                reason: if e.is_timeout() {
                    format!("request to `{url}` timed out")
                } else {
                    e.to_string()
                },
            }
        })?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "API response received"
        );

        if status.as_u16() == CSRF_EXPIRED_STATUS {
            return Err(GatewayError::CsrfExpired);
        }

        let body = response.text().await.map_err(|e| GatewayError::Transport {
            reason: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| GatewayError::InvalidBody {
            reason: e.to_string(),
        })
    }
}

/// Parse and validate an HTTP method name.
fn parse_method(method: &str) -> Result<Method> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        other => Err(GatewayError::InvalidRequest {
            reason: format!(
                "unsupported HTTP method `{other}`. Supported: GET, POST, PUT, PATCH, DELETE"
            ),
        }),
    }
}

/// Flatten a JSON payload into string pairs for a query string.
fn flatten_for_query(payload: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = payload else {
        return Vec::new();
    };
    map.iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
