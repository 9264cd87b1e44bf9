//! Configuration structures for the SharePoint integration

use serde::{Deserialize, Serialize};

/// Default Azure AD authority used for the client-credential grant.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Connection settings for one SharePoint site.
///
/// One instance is created at process start (from the environment or a
/// config file) and shared by reference for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePointConfig {
    /// Site collection URL, e.g. `https://contoso.sharepoint.com/sites/qa`.
    pub site_url: String,

    /// Azure AD tenant id.
    pub tenant_id: String,

    /// Confidential client (app registration) id.
    pub client_id: String,

    /// Confidential client secret.
    pub client_secret: String,
}

/// Exponential-backoff retry configuration.
///
/// Immutable once the client is constructed. `max_retries` counts the
/// retries after the initial attempt, so the engine makes at most
/// `max_retries + 1` attempts in total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, initial_delay_ms: 1000, max_delay_ms: 10_000, backoff_multiplier: 2.0 }
    }
}
