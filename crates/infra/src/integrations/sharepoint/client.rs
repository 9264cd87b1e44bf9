//! SharePoint REST request facade
//!
//! One client instance serves a single site collection. Every call:
//!
//! 1. Acquires a bearer token (usually from cache)
//! 2. Sends the request with the verbose OData headers
//! 3. Classifies failures and retries the retryable ones
//! 4. Unwraps the `{"d": ...}` response envelope
//!
//! Uploads and downloads skip the retry engine: their bodies are not
//! replayable and a duplicate write is worse than a surfaced failure.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, IF_MATCH};
use reqwest::{Method, Response, StatusCode};
use serde_json::{Map, Value};
use siteqa_domain::{ApiError, Result, RetryPolicy, SharePointConfig, SiteQaError};
use tracing::debug;
use uuid::Uuid;

use super::auth::{AccessTokenProvider, TokenProvider};
use super::{classify, retry};

const ODATA_VERBOSE: &str = "application/json;odata=verbose";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// SharePoint tunnels updates through POST with a method override.
const X_HTTP_METHOD: HeaderName = HeaderName::from_static("x-http-method");

/// Authenticated, retrying client for one SharePoint site.
#[derive(Clone)]
pub struct SharePointClient {
    site_url: String,
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenProvider>,
    retry: RetryPolicy,
}

impl SharePointClient {
    /// Build a client that acquires its own tokens from Azure AD.
    pub fn new(config: SharePointConfig) -> Result<Self> {
        let tokens: Arc<dyn AccessTokenProvider> = Arc::new(TokenProvider::new(config.clone()));
        Self::with_token_provider(config.site_url, tokens)
    }

    /// Build a client around an externally supplied token source.
    pub fn with_token_provider(
        site_url: impl Into<String>,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .no_proxy()
            .build()
            .map_err(|err| SiteQaError::Internal(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            site_url: site_url.into().trim_end_matches('/').to_string(),
            http,
            tokens,
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the default retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The site collection URL this client talks to, without a trailing
    /// slash.
    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// GET an endpoint and return the unwrapped response payload.
    /// Caller headers override the defaults.
    pub async fn get(&self, endpoint: &str, headers: Option<HeaderMap>) -> Result<Value> {
        Ok(self.send_json(Method::GET, endpoint, None, headers.unwrap_or_default()).await?)
    }

    /// POST a JSON body to an endpoint.
    pub async fn post(
        &self,
        endpoint: &str,
        body: &Value,
        headers: Option<HeaderMap>,
    ) -> Result<Value> {
        Ok(self.send_json(Method::POST, endpoint, Some(body), headers.unwrap_or_default()).await?)
    }

    /// Update an existing resource.
    ///
    /// SharePoint expects updates as POST with `X-HTTP-Method: MERGE`
    /// and an unconditional `If-Match`; a successful merge returns 204.
    /// Caller headers override both, e.g. to send a concrete etag.
    pub async fn patch(
        &self,
        endpoint: &str,
        body: &Value,
        headers: Option<HeaderMap>,
    ) -> Result<Value> {
        let mut merged = HeaderMap::new();
        merged.insert(IF_MATCH, HeaderValue::from_static("*"));
        merged.insert(X_HTTP_METHOD, HeaderValue::from_static("MERGE"));
        if let Some(caller) = headers {
            merged.extend(caller);
        }
        Ok(self.send_json(Method::POST, endpoint, Some(body), merged).await?)
    }

    /// Delete a resource unconditionally.
    pub async fn delete(&self, endpoint: &str, headers: Option<HeaderMap>) -> Result<Value> {
        let mut merged = HeaderMap::new();
        merged.insert(IF_MATCH, HeaderValue::from_static("*"));
        if let Some(caller) = headers {
            merged.extend(caller);
        }
        Ok(self.send_json(Method::DELETE, endpoint, None, merged).await?)
    }

    /// Upload raw bytes (file content) to an endpoint. Never retried.
    pub async fn upload(&self, endpoint: &str, content: Vec<u8>) -> Result<Value> {
        let url = self.endpoint_url(endpoint);
        let request_id = Uuid::new_v4();
        let token = self.tokens.access_token().await?;

        debug!(%request_id, url = %url, bytes = content.len(), "uploading to SharePoint");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(ACCEPT, ODATA_VERBOSE)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await
            .map_err(|err| classify::classify_transport(&err))?;

        if !response.status().is_success() {
            return Err(classify::classify_response(response).await.into());
        }
        Ok(parse_success(response).await?)
    }

    /// GET an endpoint and hand back the raw response for streaming
    /// (file downloads). Never retried.
    pub async fn download(&self, endpoint: &str) -> Result<Response> {
        let url = self.endpoint_url(endpoint);
        let request_id = Uuid::new_v4();
        let token = self.tokens.access_token().await?;

        debug!(%request_id, url = %url, "downloading from SharePoint");

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| classify::classify_transport(&err))?;

        if !response.status().is_success() {
            return Err(classify::classify_response(response).await.into());
        }
        Ok(response)
    }

    async fn send_json(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        headers: HeaderMap,
    ) -> std::result::Result<Value, ApiError> {
        let url = self.endpoint_url(endpoint);
        let request_id = Uuid::new_v4();
        let url = url.as_str();
        let headers = &headers;

        retry::execute(&self.retry, || {
            let method = method.clone();
            async move { self.attempt(method, url, body, headers, request_id).await }
        })
        .await
    }

    /// One request attempt. The token is re-acquired per attempt so a
    /// token that expired during backoff is replaced transparently.
    async fn attempt(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: &HeaderMap,
        request_id: Uuid,
    ) -> std::result::Result<Value, ApiError> {
        let token = self.tokens.access_token().await?;

        // Defaults first; caller-supplied headers replace them.
        let mut request_headers = HeaderMap::new();
        request_headers.insert(ACCEPT, HeaderValue::from_static(ODATA_VERBOSE));
        if body.is_some() {
            request_headers.insert(CONTENT_TYPE, HeaderValue::from_static(ODATA_VERBOSE));
        }
        request_headers.extend(headers.clone());

        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(token)
            .headers(request_headers);

        if let Some(body) = body {
            // Content-Type is already present, so `.json` keeps it.
            request = request.json(body);
        }

        debug!(%request_id, %method, url, "sending SharePoint request");

        let response = request.send().await.map_err(|err| classify::classify_transport(&err))?;
        let status = response.status();
        debug!(%request_id, %method, url, %status, "received SharePoint response");

        if !status.is_success() {
            return Err(classify::classify_response(response).await);
        }
        parse_success(response).await
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.site_url, endpoint.trim_start_matches('/'))
    }
}

/// Turn a successful response into its payload.
///
/// 204 and empty bodies become an empty object; JSON bodies are parsed
/// and unwrapped; anything else (e.g. the plain-text `/ItemCount`
/// responses) is returned as a string value.
async fn parse_success(response: Response) -> std::result::Result<Value, ApiError> {
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(Value::Object(Map::new()));
    }

    let text = response.text().await.map_err(|err| classify::classify_transport(&err))?;
    if text.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(parsed) => Ok(unwrap_envelope(parsed)),
        Err(_) => Ok(Value::String(text)),
    }
}

/// Strip the verbose-OData `{"d": ...}` wrapper when present.
fn unwrap_envelope(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        if let Some(inner) = map.remove("d") {
            return inner;
        }
    }
    value
}
