//! Authentication configuration.
//!
//! This module defines `AuthConfig`, which tells the session layer which
//! endpoints are part of the auth exchange (and therefore exempt from
//! credential attachment and refresh), which header carries the credential,
//! and how long an outgoing request may wait for a login flow to finish
//! persisting its token.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for the durable token directory path
const APP_NAME: &str = "studyhall";

/// File name for the durable token record
const TOKEN_FILE: &str = "session-token.json";

/// Default bound for waiting on an in-flight login to persist its token.
/// Hundreds of milliseconds, not seconds - ordinary requests must not feel slow.
const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Path fragment identifying the login endpoint.
    pub login_path: String,
    /// Path fragment identifying the registration endpoint.
    pub register_path: String,
    /// Path fragment identifying the refresh endpoint.
    pub refresh_path: String,
    /// Full URL the refresh exchange is sent to.
    pub refresh_url: String,
    /// Header carrying the credential, on requests and on responses.
    pub token_header: String,
    /// Credential scheme prefix, applied exactly once.
    pub scheme: String,
    /// Bound in milliseconds for the acquisition wait.
    pub acquire_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: "/auth/login".to_string(),
            register_path: "/auth/register".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            refresh_url: "https://api.studyhall.app/auth/refresh".to_string(),
            token_header: "authorization".to_string(),
            scheme: "Bearer".to_string(),
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
        }
    }
}

impl AuthConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Whether a URL belongs to the auth exchange itself.
    ///
    /// Login, registration and refresh calls carry their own credentials and
    /// must never trigger attachment or a refresh-of-refresh loop.
    pub fn is_auth_endpoint(&self, url: &str) -> bool {
        url.contains(&self.login_path)
            || url.contains(&self.register_path)
            || url.contains(&self.refresh_path)
    }

    /// Default location for the durable token record.
    pub fn token_file() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(TOKEN_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_endpoints_recognized() {
        let config = AuthConfig::default();
        assert!(config.is_auth_endpoint("https://api.studyhall.app/auth/login"));
        assert!(config.is_auth_endpoint("https://api.studyhall.app/auth/refresh"));
        assert!(config.is_auth_endpoint("https://api.studyhall.app/auth/register"));
        assert!(!config.is_auth_endpoint("https://api.studyhall.app/boards/42"));
        assert!(!config.is_auth_endpoint("https://api.studyhall.app/studies"));
    }

    #[test]
    fn test_default_wait_bound_is_subsecond() {
        let config = AuthConfig::default();
        assert!(config.acquire_timeout() < Duration::from_secs(1));
    }
}
