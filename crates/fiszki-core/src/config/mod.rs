//! Remote endpoint configuration.
//!
//! Supabase URL and anon key are public, build- or user-provisioned values.
//! Missing configuration means the app runs local-only.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub use crate::models::{SyncSettings, DEFAULT_AUTO_SYNC_INTERVAL};

const AUTH_PATH: &str = "/auth/v1";
const REST_PATH: &str = "/rest/v1";

/// Supabase project endpoint and public key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project base URL without trailing slash or API suffix
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    /// Validate and normalize a URL/key pair.
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        let url = normalize_project_url(url)?;
        let anon_key = anon_key.trim();
        if anon_key.is_empty() {
            return Err(Error::Validation(
                "Supabase anon key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
        })
    }

    /// Resolve from optional values, e.g. profile fields and environment.
    ///
    /// Both missing yields `None`; exactly one missing is an error.
    pub fn resolve(url: Option<String>, anon_key: Option<String>) -> Result<Option<Self>> {
        match (normalize_text_option(url), normalize_text_option(anon_key)) {
            (None, None) => Ok(None),
            (Some(url), Some(anon_key)) => Self::new(&url, &anon_key).map(Some),
            (Some(_), None) => Err(Error::Validation(
                "SUPABASE_ANON_KEY is required when SUPABASE_URL is set".to_string(),
            )),
            (None, Some(_)) => Err(Error::Validation(
                "SUPABASE_URL is required when SUPABASE_ANON_KEY is set".to_string(),
            )),
        }
    }

    #[must_use]
    pub fn auth_url(&self) -> String {
        format!("{}{AUTH_PATH}", self.url)
    }

    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}{REST_PATH}", self.url)
    }
}

fn normalize_project_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::Validation("Supabase URL must not be empty".to_string()));
    }
    if !is_http_url(trimmed) {
        return Err(Error::Validation(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    let base = trimmed
        .strip_suffix(AUTH_PATH)
        .or_else(|| trimmed.strip_suffix(REST_PATH))
        .unwrap_or(trimmed);
    Ok(base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_derive_from_project_url() {
        let config = SupabaseConfig::new("https://demo.supabase.co/", "anon").unwrap();
        assert_eq!(config.auth_url(), "https://demo.supabase.co/auth/v1");
        assert_eq!(config.rest_url(), "https://demo.supabase.co/rest/v1");
    }

    #[test]
    fn api_suffix_is_stripped() {
        let config = SupabaseConfig::new("https://demo.supabase.co/auth/v1", "anon").unwrap();
        assert_eq!(config.url, "https://demo.supabase.co");
    }

    #[test]
    fn resolve_requires_both_or_neither() {
        assert!(SupabaseConfig::resolve(None, Some("  ".into())).unwrap().is_none());
        assert!(SupabaseConfig::resolve(Some("https://x.supabase.co".into()), None).is_err());
        let resolved =
            SupabaseConfig::resolve(Some("https://x.supabase.co".into()), Some("anon".into()))
                .unwrap()
                .unwrap();
        assert_eq!(resolved.anon_key, "anon");
    }

    #[test]
    fn rejects_non_http_url() {
        assert!(matches!(
            SupabaseConfig::new("ftp://demo", "anon"),
            Err(Error::Validation(_))
        ));
    }
}
