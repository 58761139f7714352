//! Session facade.
//!
//! The five operations here are the entire surface the rest of the
//! application (forms, route guards, tab views) is allowed to depend on.
//! Components never reach past this into the tiers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use crate::config::AuthConfig;
use crate::token::tier::{FileTier, GlobalTier, MemoryTier};
use crate::token::waiter::{self, AcquisitionTimeout};
use crate::token::{classify, codec, SessionState, TokenStore};

#[derive(Clone)]
pub struct Session {
    store: Arc<TokenStore>,
}

impl Session {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self { store }
    }

    /// Session over the standard tier stack: durable file, in-memory backup,
    /// process-global fallback.
    pub fn with_default_tiers(config: &AuthConfig) -> Result<Self> {
        let path = AuthConfig::token_file()?;
        let store = TokenStore::new(
            vec![
                Box::new(FileTier::new(path)),
                Box::new(MemoryTier::default()),
                Box::new(GlobalTier),
            ],
            config.scheme.clone(),
        );
        Ok(Self::new(Arc::new(store)))
    }

    /// Shared store handle for wiring up a `SessionClient`.
    pub fn store(&self) -> Arc<TokenStore> {
        self.store.clone()
    }

    /// Current token in header-ready form, recovering backups if needed.
    pub fn token(&self) -> Option<String> {
        self.store.read()
    }

    /// Store a token. The scheme prefix is applied exactly once regardless
    /// of whether `raw` already carries it; rewriting the same value is a
    /// no-op.
    pub fn set_token(&self, raw: &str) {
        self.store.write(raw);
    }

    /// Drop the durable token; backups too when `include_backups` is set.
    pub fn remove_token(&self, include_backups: bool) {
        self.store.clear(include_backups);
    }

    /// Whether a raw credential decodes and is not yet expired.
    pub fn is_token_valid(&self, raw: &str) -> bool {
        codec::decode(raw)
            .map(|claims| !claims.is_expired(Utc::now().timestamp_millis()))
            .unwrap_or(false)
    }

    /// Bounded wait for a token that a concurrent login flow may still be
    /// persisting.
    pub async fn wait_for_token(&self, timeout: Duration) -> Result<String, AcquisitionTimeout> {
        waiter::wait_for_token(&self.store, timeout).await
    }

    /// Derived state of the current session; read-only.
    pub fn state(&self) -> SessionState {
        classify(&self.store, Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::codec::tests::token_expiring_in;
    use crate::token::tier::MemoryTier;

    fn memory_session() -> Session {
        Session::new(Arc::new(TokenStore::new(
            vec![Box::new(MemoryTier::default()), Box::new(MemoryTier::default())],
            "Bearer",
        )))
    }

    #[test]
    fn test_set_then_get_returns_prefixed_form() {
        let session = memory_session();
        session.set_token("abc.def.ghi");
        assert_eq!(session.token().as_deref(), Some("Bearer abc.def.ghi"));
    }

    #[test]
    fn test_remove_token() {
        let session = memory_session();
        session.set_token("abc.def.ghi");
        session.remove_token(true);
        assert_eq!(session.token(), None);
        assert_eq!(session.state(), SessionState::NoToken);
    }

    #[test]
    fn test_is_token_valid() {
        let session = memory_session();
        assert!(session.is_token_valid(&token_expiring_in(60_000)));
        assert!(!session.is_token_valid(&token_expiring_in(-1_000)));
        assert!(!session.is_token_valid("not-a-credential"));
    }

    #[test]
    fn test_state_reflects_stored_token() {
        let session = memory_session();
        assert_eq!(session.state(), SessionState::NoToken);

        session.set_token(&token_expiring_in(60_000));
        assert_eq!(session.state(), SessionState::Valid);

        session.set_token(&token_expiring_in(-1_000));
        assert_eq!(session.state(), SessionState::Expired);
    }

    #[tokio::test]
    async fn test_wait_for_token_sees_concurrent_login() {
        let session = memory_session();
        let writer = session.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.set_token("fresh.log.in");
        });

        let token = session
            .wait_for_token(Duration::from_millis(500))
            .await
            .expect("token");
        assert_eq!(token, "Bearer fresh.log.in");
    }
}
