//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error returned by the SharePoint integration layer.
///
/// Created once per failed response or transport error and propagated
/// unchanged up the call stack. The retry engine consumes `retryable`
/// and `retry_after_secs` to decide whether (and how long) to back off.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable message, parsed from the provider error envelope
    /// when one is present.
    pub message: String,

    /// HTTP status of the failed response (or a synthetic 5xx for
    /// transport-level failures).
    pub http_status: u16,

    /// Provider error code, e.g. `"-2147024860, Microsoft.SharePoint..."`
    /// or a synthetic `HTTP_<status>` fallback.
    pub provider_code: String,

    /// True exactly for throttling and transient-availability failures
    /// (HTTP 429, 503, 504 and request timeouts).
    pub retryable: bool,

    /// Server-supplied `Retry-After` hint, in seconds.
    pub retry_after_secs: Option<u64>,
}

/// Error category derived from an [`ApiError`]'s status and code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Missing or malformed credentials / site URL. Fatal, never retried.
    Configuration,

    /// Token acquisition against the identity authority failed. Not
    /// retried by the engine; the next call attempts a fresh acquisition.
    AuthToken,

    /// Rate limited by the backend (HTTP 429).
    Throttled,

    /// Backend temporarily unavailable (HTTP 503).
    Unavailable,

    /// Gateway or request timeout (HTTP 504, client-side timeout).
    Timeout,

    /// Any other 4xx. Surfaced immediately, never retried.
    Client,

    /// Non-HTTP failure (DNS, connection reset, malformed payload).
    RequestFailed,
}

pub(crate) const CONFIGURATION_ERROR_CODE: &str = "CONFIGURATION_ERROR";
pub(crate) const AUTH_CODE_PREFIX: &str = "AUTH";

impl ApiError {
    /// Build an error from its parts.
    pub fn new(
        message: impl Into<String>,
        http_status: u16,
        provider_code: impl Into<String>,
        retryable: bool,
        retry_after_secs: Option<u64>,
    ) -> Self {
        Self {
            message: message.into(),
            http_status,
            provider_code: provider_code.into(),
            retryable,
            retry_after_secs,
        }
    }

    /// Missing credentials or site URL. Fatal, not retryable.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(message, 500, CONFIGURATION_ERROR_CODE, false, None)
    }

    /// Token acquisition failure. Not retryable by the engine; callers
    /// re-attempt a fresh acquisition on their next request.
    ///
    /// Authority codes like `invalid_client` are prefixed with `AUTH_`
    /// so the category survives in `provider_code`.
    pub fn auth_token(message: impl Into<String>, http_status: u16, code: impl Into<String>) -> Self {
        let code = code.into();
        let code = if code.is_empty() {
            "AUTH_TOKEN_FAILED".to_string()
        } else if code.starts_with(AUTH_CODE_PREFIX) {
            code
        } else {
            format!("AUTH_{code}")
        };
        Self::new(message, http_status, code, false, None)
    }

    /// Generic wrapper for non-HTTP failures (DNS, connection errors).
    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::new(message, 500, "REQUEST_FAILED", false, None)
    }

    /// Client-side request timeout, classified as a retryable transport
    /// error subject to the normal retry policy.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(message, 504, "REQUEST_TIMEOUT", true, None)
    }

    /// Category for this error, derived from status and provider code.
    pub fn kind(&self) -> ApiErrorKind {
        if self.provider_code == CONFIGURATION_ERROR_CODE {
            return ApiErrorKind::Configuration;
        }
        if self.provider_code.starts_with(AUTH_CODE_PREFIX) {
            return ApiErrorKind::AuthToken;
        }
        match self.http_status {
            429 => ApiErrorKind::Throttled,
            503 => ApiErrorKind::Unavailable,
            504 => ApiErrorKind::Timeout,
            400..=499 => ApiErrorKind::Client,
            _ => ApiErrorKind::RequestFailed,
        }
    }

    /// True when the caller may safely retry after backing off.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// True for a 404 response.
    pub fn is_not_found(&self) -> bool {
        self.http_status == 404
    }
}

/// Main error type for SiteQA
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SiteQaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Structured SharePoint API error, preserved so callers can inspect
    /// status, provider code, and retryability for their own fallbacks.
    #[error(transparent)]
    Api(#[from] Box<ApiError>),
}

impl From<ApiError> for SiteQaError {
    fn from(err: ApiError) -> Self {
        Self::Api(Box::new(err))
    }
}

/// Result type alias for SiteQA operations
pub type Result<T> = std::result::Result<T, SiteQaError>;
