//! Error classification for SharePoint responses
//!
//! SharePoint returns two error envelope shapes depending on the API
//! surface and the OData profile:
//!
//! ```json
//! {"error": {"code": "...", "message": {"value": "..."}}}
//! {"odata.error": {"code": "...", "message": {"value": "..."}}}
//! ```
//!
//! The `message` member is sometimes a bare string. Everything parsed
//! here lands in one [`ApiError`] carrying the status, provider code,
//! retryability, and any `Retry-After` hint.

use reqwest::StatusCode;
use serde_json::Value;
use siteqa_domain::ApiError;

/// Statuses worth retrying: throttling and transient availability.
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 503 | 504)
}

/// Classify a failed response from its already-read body.
pub fn classify_body(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> ApiError {
    let (message, code) = parse_error_envelope(body).unwrap_or_else(|| {
        tracing::warn!(status = status.as_u16(), "SharePoint error response had no recognizable envelope");
        let reason = status.canonical_reason().unwrap_or("Unknown Error");
        (format!("{} {}", status.as_u16(), reason), format!("HTTP_{}", status.as_u16()))
    });

    ApiError::new(message, status.as_u16(), code, is_retryable_status(status), retry_after_secs)
}

/// Classify a failed response, consuming its body.
pub async fn classify_response(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    classify_body(status, retry_after_secs, &body)
}

/// Classify an error raised before any response arrived.
///
/// Timeouts are retryable under the normal policy; everything else
/// (DNS, refused connections, TLS) fails immediately.
pub fn classify_transport(err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::timeout(format!("Request timed out: {err}"))
    } else {
        ApiError::request_failed(format!("Request failed: {err}"))
    }
}

/// Extract `(message, code)` from either envelope shape, if present.
fn parse_error_envelope(body: &str) -> Option<(String, String)> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let envelope = parsed.get("error").or_else(|| parsed.get("odata.error"))?;

    let message = match envelope.get("message") {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Object(obj)) => obj.get("value").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }?;

    let code = envelope
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default();

    Some((message, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_error_envelope() {
        let body = r#"{"error": {"code": "-2130575338, Microsoft.SharePoint.SPException", "message": {"value": "Item does not exist."}}}"#;
        let err = classify_body(StatusCode::NOT_FOUND, None, body);
        assert_eq!(err.message, "Item does not exist.");
        assert_eq!(err.provider_code, "-2130575338, Microsoft.SharePoint.SPException");
        assert_eq!(err.http_status, 404);
        assert!(!err.retryable);
    }

    #[test]
    fn parses_odata_error_envelope() {
        let body = r#"{"odata.error": {"code": "-2147024860", "message": {"value": "Query exceeds threshold."}}}"#;
        let err = classify_body(StatusCode::BAD_REQUEST, None, body);
        assert_eq!(err.message, "Query exceeds threshold.");
        assert_eq!(err.provider_code, "-2147024860");
    }

    #[test]
    fn accepts_message_as_bare_string() {
        let body = r#"{"error": {"code": "throttled", "message": "Too many requests"}}"#;
        let err = classify_body(StatusCode::TOO_MANY_REQUESTS, Some(12), body);
        assert_eq!(err.message, "Too many requests");
        assert!(err.retryable);
        assert_eq!(err.retry_after_secs, Some(12));
    }

    #[test]
    fn falls_back_on_non_json_body() {
        let err = classify_body(StatusCode::SERVICE_UNAVAILABLE, None, "<html>503</html>");
        assert_eq!(err.message, "503 Service Unavailable");
        assert_eq!(err.provider_code, "HTTP_503");
        assert!(err.retryable);
    }

    #[test]
    fn falls_back_on_unrecognized_json_shape() {
        let err = classify_body(StatusCode::INTERNAL_SERVER_ERROR, None, r#"{"detail": "boom"}"#);
        assert_eq!(err.provider_code, "HTTP_500");
        assert!(!err.retryable);
    }

    #[test]
    fn envelope_without_code_gets_empty_code() {
        let body = r#"{"error": {"message": {"value": "No code here"}}}"#;
        let err = classify_body(StatusCode::FORBIDDEN, None, body);
        assert_eq!(err.message, "No code here");
        assert_eq!(err.provider_code, "");
    }

    #[test]
    fn only_throttle_statuses_are_retryable() {
        for status in [429u16, 503, 504] {
            let status = StatusCode::from_u16(status).unwrap();
            assert!(classify_body(status, None, "").retryable, "{status}");
        }
        for status in [400u16, 401, 403, 404, 409, 500, 501] {
            let status = StatusCode::from_u16(status).unwrap();
            assert!(!classify_body(status, None, "").retryable, "{status}");
        }
    }

    #[tokio::test]
    async fn response_classification_reads_retry_after_header() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(429)
                    .insert_header("Retry-After", "7")
                    .set_body_string(r#"{"error": {"code": "429", "message": {"value": "Throttled"}}}"#),
            )
            .mount(&server)
            .await;

        let response = reqwest::get(server.uri()).await.unwrap();
        let err = classify_response(response).await;
        assert_eq!(err.http_status, 429);
        assert_eq!(err.retry_after_secs, Some(7));
        assert_eq!(err.message, "Throttled");
    }
}
