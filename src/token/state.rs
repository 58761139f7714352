//! Derived session state.
//!
//! Nothing is stored: the state is recomputed on demand from the store and
//! the codec. `Expired` and `Unknown` are both unusable, but callers treat
//! them differently - an expired token gets a silent refresh attempt, an
//! undecodable one forces a full re-login because its payload cannot be
//! trusted.

use tracing::debug;

use crate::token::codec;
use crate::token::store::TokenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoToken,
    Valid,
    Expired,
    Unknown,
}

/// Classify the current session. Read-only: uses `peek()` so repeated calls
/// never perturb storage.
pub fn classify(store: &TokenStore, now_millis: i64) -> SessionState {
    let token = match store.peek() {
        Some(token) => token,
        None => return SessionState::NoToken,
    };
    match codec::decode(&token) {
        Ok(claims) if claims.is_expired(now_millis) => SessionState::Expired,
        Ok(_) => SessionState::Valid,
        Err(e) => {
            debug!(error = %e, "stored credential is undecodable");
            SessionState::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::token::codec::tests::token_expiring_in;
    use crate::token::tier::MemoryTier;

    fn memory_store() -> TokenStore {
        TokenStore::new(vec![Box::new(MemoryTier::default())], "Bearer")
    }

    #[test]
    fn test_no_token() {
        let store = memory_store();
        let now = Utc::now().timestamp_millis();
        assert_eq!(classify(&store, now), SessionState::NoToken);
    }

    #[test]
    fn test_expiry_one_millisecond_each_side() {
        let store = memory_store();
        let token = crate::token::codec::tests::fake_token(&serde_json::json!({ "exp": 10 }));
        store.write(&token);

        // exp = 10s -> 10_000ms
        assert_eq!(classify(&store, 10_001), SessionState::Expired);
        assert_eq!(classify(&store, 9_999), SessionState::Valid);
    }

    #[test]
    fn test_expired_token_in_the_past() {
        let store = memory_store();
        store.write(&token_expiring_in(-5_000));
        let now = Utc::now().timestamp_millis();
        assert_eq!(classify(&store, now), SessionState::Expired);
    }

    #[test]
    fn test_valid_token_in_the_future() {
        let store = memory_store();
        store.write(&token_expiring_in(60_000));
        let now = Utc::now().timestamp_millis();
        assert_eq!(classify(&store, now), SessionState::Valid);
    }

    #[test]
    fn test_undecodable_token_is_unknown_not_a_panic() {
        let store = memory_store();
        store.write("garbage-not-a-jwt");
        let now = Utc::now().timestamp_millis();
        assert_eq!(classify(&store, now), SessionState::Unknown);
    }
}
