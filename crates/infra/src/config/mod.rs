//! Configuration loader
//!
//! Loads SharePoint connection settings from environment variables.
//!
//! ## Environment Variables
//! - `SHAREPOINT_SITE_URL`: Site collection URL
//! - `AZURE_TENANT_ID` or `TENANT_ID`: Azure AD tenant id
//! - `AZURE_CLIENT_ID` or `CLIENT_ID`: App registration client id
//! - `AZURE_CLIENT_SECRET` or `CLIENT_SECRET`: App registration secret
//!
//! The `AZURE_`-prefixed names win when both are set; the unprefixed
//! names are kept for backward compatibility with older deployments.

use siteqa_domain::{Result, SharePointConfig, SiteQaError};

/// Load SharePoint configuration from environment variables.
///
/// All missing variables are reported together so a misconfigured
/// deployment fails with one actionable message.
///
/// # Errors
/// Returns `SiteQaError::Config` naming every missing variable.
pub fn load_from_env() -> Result<SharePointConfig> {
    let site_url = std::env::var("SHAREPOINT_SITE_URL").ok();
    let tenant_id = env_var_with_fallback("AZURE_TENANT_ID", "TENANT_ID");
    let client_id = env_var_with_fallback("AZURE_CLIENT_ID", "CLIENT_ID");
    let client_secret = env_var_with_fallback("AZURE_CLIENT_SECRET", "CLIENT_SECRET");

    let mut missing = Vec::new();
    if site_url.is_none() {
        missing.push("SHAREPOINT_SITE_URL");
    }
    if tenant_id.is_none() {
        missing.push("AZURE_TENANT_ID or TENANT_ID");
    }
    if client_id.is_none() {
        missing.push("AZURE_CLIENT_ID or CLIENT_ID");
    }
    if client_secret.is_none() {
        missing.push("AZURE_CLIENT_SECRET or CLIENT_SECRET");
    }

    if !missing.is_empty() {
        return Err(SiteQaError::Config(format!(
            "Missing required environment variables: {}",
            missing.join(", ")
        )));
    }

    tracing::info!("SharePoint configuration loaded from environment variables");

    // Unwraps guarded by the missing-variable check above.
    Ok(SharePointConfig {
        site_url: site_url.unwrap_or_default(),
        tenant_id: tenant_id.unwrap_or_default(),
        client_id: client_id.unwrap_or_default(),
        client_secret: client_secret.unwrap_or_default(),
    })
}

fn env_var_with_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary).or_else(|_| std::env::var(fallback)).ok()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use once_cell::sync::Lazy;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: &[&str] = &[
        "SHAREPOINT_SITE_URL",
        "AZURE_TENANT_ID",
        "TENANT_ID",
        "AZURE_CLIENT_ID",
        "CLIENT_ID",
        "AZURE_CLIENT_SECRET",
        "CLIENT_SECRET",
    ];

    fn clear_all() {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn loads_with_azure_prefixed_names() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();

        std::env::set_var("SHAREPOINT_SITE_URL", "https://contoso.sharepoint.com/sites/qa");
        std::env::set_var("AZURE_TENANT_ID", "tenant-a");
        std::env::set_var("AZURE_CLIENT_ID", "client-a");
        std::env::set_var("AZURE_CLIENT_SECRET", "secret-a");

        let config = load_from_env().expect("config should load");
        assert_eq!(config.site_url, "https://contoso.sharepoint.com/sites/qa");
        assert_eq!(config.tenant_id, "tenant-a");
        assert_eq!(config.client_id, "client-a");
        assert_eq!(config.client_secret, "secret-a");

        clear_all();
    }

    #[test]
    fn falls_back_to_unprefixed_names() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();

        std::env::set_var("SHAREPOINT_SITE_URL", "https://contoso.sharepoint.com/sites/qa");
        std::env::set_var("TENANT_ID", "tenant-b");
        std::env::set_var("CLIENT_ID", "client-b");
        std::env::set_var("CLIENT_SECRET", "secret-b");

        let config = load_from_env().expect("config should load");
        assert_eq!(config.tenant_id, "tenant-b");
        assert_eq!(config.client_id, "client-b");

        clear_all();
    }

    #[test]
    fn prefixed_names_win_over_unprefixed() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();

        std::env::set_var("SHAREPOINT_SITE_URL", "https://contoso.sharepoint.com/sites/qa");
        std::env::set_var("AZURE_TENANT_ID", "tenant-azure");
        std::env::set_var("TENANT_ID", "tenant-legacy");
        std::env::set_var("AZURE_CLIENT_ID", "client-a");
        std::env::set_var("AZURE_CLIENT_SECRET", "secret-a");

        let config = load_from_env().expect("config should load");
        assert_eq!(config.tenant_id, "tenant-azure");

        clear_all();
    }

    #[test]
    fn reports_every_missing_variable_at_once() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_all();

        let err = load_from_env().expect_err("should fail without env vars");
        let message = err.to_string();
        assert!(message.contains("SHAREPOINT_SITE_URL"));
        assert!(message.contains("AZURE_TENANT_ID or TENANT_ID"));
        assert!(message.contains("AZURE_CLIENT_ID or CLIENT_ID"));
        assert!(message.contains("AZURE_CLIENT_SECRET or CLIENT_SECRET"));
        assert!(matches!(err, SiteQaError::Config(_)));
    }
}
