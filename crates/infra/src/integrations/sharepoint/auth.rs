//! Azure AD token acquisition for SharePoint
//!
//! Implements the OAuth2 client-credential grant against the v2.0 token
//! endpoint and caches the resulting bearer token until shortly before
//! it expires.
//!
//! ## Caching
//! - A cached token is reused while more than five minutes of lifetime
//!   remain, so a token is never handed out that could expire mid-request.
//! - Concurrent callers that miss the cache are funneled through a
//!   single refresh; the others pick up the freshly cached token.
//! - A failed refresh clears the cache so the next call starts clean.

use async_trait::async_trait;
use serde::Deserialize;
use siteqa_domain::{ApiError, SharePointConfig, DEFAULT_AUTHORITY};
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// Reuse window: refresh once fewer than five minutes remain.
const EXPIRY_BUFFER_MS: u64 = 5 * 60 * 1000;

/// Fallback lifetime when the authority omits expiry information.
const DEFAULT_LIFETIME_SECS: u64 = 3600;

/// Source of bearer tokens for SharePoint requests.
///
/// The client takes this as a trait object so tests can inject a fixed
/// token without standing up a token endpoint.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a bearer token valid for at least the next few minutes.
    async fn access_token(&self) -> Result<String, ApiError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    expires_on: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at_ms: u64,
}

impl CachedToken {
    fn is_usable(&self, now_ms: u64) -> bool {
        now_ms + EXPIRY_BUFFER_MS < self.expires_at_ms
    }
}

/// Client-credential token provider with an in-process cache.
pub struct TokenProvider {
    config: SharePointConfig,
    authority: String,
    http: reqwest::Client,
    cache: RwLock<Option<CachedToken>>,
    // Serializes cache misses so only one refresh hits the authority.
    refresh_gate: Mutex<()>,
}

impl TokenProvider {
    pub fn new(config: SharePointConfig) -> Self {
        Self::with_authority(config, DEFAULT_AUTHORITY)
    }

    /// Construct against a non-default authority endpoint. Used by tests
    /// to point at a local mock server.
    pub fn with_authority(config: SharePointConfig, authority: impl Into<String>) -> Self {
        Self {
            config,
            authority: authority.into(),
            http: reqwest::Client::new(),
            cache: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Startup health check: verify the credential fields and force one
    /// real acquisition against the authority.
    pub async fn validate_config(&self) -> Result<(), ApiError> {
        self.get_token(true).await.map(|_| ())
    }

    fn check_config(&self) -> Result<(), ApiError> {
        let mut missing = Vec::new();
        if self.config.site_url.is_empty() {
            missing.push("site_url");
        }
        if self.config.tenant_id.is_empty() {
            missing.push("tenant_id");
        }
        if self.config.client_id.is_empty() {
            missing.push("client_id");
        }
        if self.config.client_secret.is_empty() {
            missing.push("client_secret");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::configuration(format!(
                "SharePoint configuration incomplete: missing {}",
                missing.join(", ")
            )))
        }
    }

    /// Return a cached token, or acquire a fresh one when the cache is
    /// empty, expired, or `force_refresh` is set.
    pub async fn get_token(&self, force_refresh: bool) -> Result<String, ApiError> {
        let now = now_ms();

        if !force_refresh {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_usable(now) {
                    tracing::debug!("Using cached SharePoint access token");
                    return Ok(cached.value.clone());
                }
            }
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited on the gate.
        if !force_refresh {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_usable(now_ms()) {
                    return Ok(cached.value.clone());
                }
            }
        }

        match self.acquire_token().await {
            Ok(token) => {
                let value = token.value.clone();
                *self.cache.write().await = Some(token);
                Ok(value)
            }
            Err(err) => {
                *self.cache.write().await = None;
                Err(err)
            }
        }
    }

    /// Drop any cached token; the next call acquires a fresh one.
    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
        tracing::debug!("SharePoint token cache cleared");
    }

    /// Expiry of the cached token in epoch milliseconds, if one is held.
    pub async fn token_expiration(&self) -> Option<u64> {
        self.cache.read().await.as_ref().map(|cached| cached.expires_at_ms)
    }

    async fn acquire_token(&self) -> Result<CachedToken, ApiError> {
        self.check_config()?;

        let scope = derive_scope(&self.config.site_url)?;
        let endpoint = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            self.config.tenant_id
        );

        tracing::debug!(tenant_id = %self.config.tenant_id, "Acquiring SharePoint access token");

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", scope.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .http
            .post(&endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|err| ApiError::auth_token(format!("Token request failed: {err}"), 500, ""))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: TokenErrorResponse = serde_json::from_str(&body).unwrap_or(TokenErrorResponse {
                error: None,
                error_description: None,
            });
            let message = parsed
                .error_description
                .unwrap_or_else(|| format!("Token endpoint returned {status}"));
            let code = parsed.error.unwrap_or_default();
            tracing::warn!(status = %status, code = %code, "SharePoint token acquisition failed");
            return Err(ApiError::auth_token(message, status.as_u16(), code));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| ApiError::auth_token(format!("Malformed token response: {err}"), 500, ""))?;

        let expires_at_ms = token_expiry_ms(now_ms(), token.expires_in, token.expires_on.as_deref());
        tracing::info!(expires_at_ms, "Acquired SharePoint access token");

        Ok(CachedToken { value: token.access_token, expires_at_ms })
    }
}

#[async_trait]
impl AccessTokenProvider for TokenProvider {
    async fn access_token(&self) -> Result<String, ApiError> {
        self.get_token(false).await
    }
}

/// Derive the `.default` scope for the site's host, e.g.
/// `https://contoso.sharepoint.com/.default`.
fn derive_scope(site_url: &str) -> Result<String, ApiError> {
    let parsed = Url::parse(site_url)
        .map_err(|err| ApiError::configuration(format!("Invalid SharePoint site URL '{site_url}': {err}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ApiError::configuration(format!("SharePoint site URL '{site_url}' has no host")))?;
    Ok(format!("{}://{}/.default", parsed.scheme(), host))
}

fn token_expiry_ms(now_ms: u64, expires_in: Option<u64>, expires_on: Option<&str>) -> u64 {
    if let Some(secs) = expires_in {
        return now_ms + secs * 1000;
    }
    if let Some(epoch_secs) = expires_on.and_then(|raw| raw.parse::<u64>().ok()) {
        return epoch_secs * 1000;
    }
    now_ms + DEFAULT_LIFETIME_SECS * 1000
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SharePointConfig {
        SharePointConfig {
            site_url: "https://contoso.sharepoint.com/sites/qa".into(),
            tenant_id: "tenant".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
        }
    }

    #[test]
    fn scope_is_host_root_default() {
        let scope = derive_scope("https://contoso.sharepoint.com/sites/qa").unwrap();
        assert_eq!(scope, "https://contoso.sharepoint.com/.default");
    }

    #[test]
    fn scope_preserves_scheme() {
        let scope = derive_scope("http://localhost/sites/qa").unwrap();
        assert_eq!(scope, "http://localhost/.default");
    }

    #[test]
    fn scope_rejects_garbage_url() {
        let err = derive_scope("not a url").unwrap_err();
        assert_eq!(err.provider_code, "CONFIGURATION_ERROR");
    }

    #[test]
    fn cached_token_respects_expiry_buffer() {
        let token = CachedToken { value: "t".into(), expires_at_ms: 1_000_000 };
        // More than five minutes of lifetime left.
        assert!(token.is_usable(1_000_000 - EXPIRY_BUFFER_MS - 1));
        // Exactly at the buffer boundary counts as expired.
        assert!(!token.is_usable(1_000_000 - EXPIRY_BUFFER_MS));
        assert!(!token.is_usable(1_000_000));
    }

    #[test]
    fn expiry_prefers_expires_in() {
        assert_eq!(token_expiry_ms(1000, Some(60), Some("999999")), 1000 + 60_000);
    }

    #[test]
    fn expiry_falls_back_to_expires_on_epoch_seconds() {
        assert_eq!(token_expiry_ms(1000, None, Some("1700000000")), 1_700_000_000_000);
    }

    #[test]
    fn expiry_defaults_to_one_hour() {
        assert_eq!(token_expiry_ms(1000, None, None), 1000 + 3_600_000);
        assert_eq!(token_expiry_ms(1000, None, Some("not-a-number")), 1000 + 3_600_000);
    }

    #[test]
    fn config_check_reports_all_missing_fields() {
        let provider = TokenProvider::new(SharePointConfig {
            site_url: String::new(),
            tenant_id: String::new(),
            client_id: "client".into(),
            client_secret: String::new(),
        });
        let err = provider.check_config().unwrap_err();
        assert!(err.message.contains("site_url"));
        assert!(err.message.contains("tenant_id"));
        assert!(err.message.contains("client_secret"));
        assert!(!err.message.contains("client_id,"));
    }

    #[test]
    fn config_check_accepts_complete_config() {
        assert!(TokenProvider::new(config()).check_config().is_ok());
    }

    #[tokio::test]
    async fn token_expiration_is_none_without_cache() {
        let provider = TokenProvider::new(config());
        assert!(provider.token_expiration().await.is_none());
        provider.clear_cache().await;
        assert!(provider.token_expiration().await.is_none());
    }
}
