//! API Middleware
//!
//! API key authentication and request logging.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::config::hash_api_key;

/// Expected API key, kept only as its SHA-256 digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiKeyDigest([u8; 32]);

impl ApiKeyDigest {
    pub fn new(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    pub fn from_plaintext(key: &str) -> Self {
        Self(hash_api_key(key))
    }

    /// Compare without short-circuiting on the first differing byte
    fn matches(&self, presented: &str) -> bool {
        let presented = hash_api_key(presented);
        self.0
            .iter()
            .zip(presented.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Header carrying the correlation id in both directions
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Per-request metadata inserted by [`logging_middleware`]
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub correlation_id: Uuid,
}

fn unauthorized(error: &str, error_code: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": error,
            "error_code": error_code
        })),
    )
        .into_response()
}

// =========================================================================
// API Key Authentication Middleware
// =========================================================================

/// Validate the X-API-Key header against the configured key
pub async fn auth_middleware(
    State(expected): State<ApiKeyDigest>,
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let api_key = headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("Missing X-API-Key header", "missing_api_key"))?;

    if !expected.matches(api_key) {
        let fingerprint = hex::encode(&hash_api_key(api_key)[..4]);
        tracing::warn!(
            uri = %request.uri(),
            key_fingerprint = %fingerprint,
            "Rejected request with invalid API key"
        );
        return Err(unauthorized("Invalid API key", "invalid_api_key"));
    }

    Ok(next.run(request).await)
}

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["x-api-key", "authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware. Runs outermost, so it also assigns the
/// correlation id (taken from `X-Correlation-Id` or freshly generated) and
/// echoes it on the response.
pub async fn logging_middleware(mut request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = mask_headers_for_logging(request.headers());
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    request
        .extensions_mut()
        .insert(RequestContext { correlation_id });

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = %correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        correlation_id = %correlation_id,
        "Request completed"
    );

    response
}
