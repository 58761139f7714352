//! Bounded event-driven wait for a token write.
//!
//! Login and registration persist their token asynchronously relative to the
//! first authenticated request the UI fires right after them. Without this
//! wait that first request would go out unauthenticated. The wait races the
//! store's write signal against a deadline; the subscription and the timer
//! are both torn down when the function returns, so repeated timeouts on a
//! long-lived client accumulate nothing.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::debug;

use crate::token::store::{StoreEvent, TokenStore};

/// The bounded wait elapsed with no token written.
///
/// Recoverable: the caller proceeds without a credential and lets the server
/// decide, since some endpoints are intentionally unauthenticated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("timed out waiting for a session token")]
pub struct AcquisitionTimeout;

/// Wait up to `timeout` for a token to become readable.
///
/// The signal only says "something changed", so every wakeup re-reads the
/// store rather than trusting a value carried across the suspension point.
pub async fn wait_for_token(
    store: &TokenStore,
    timeout: Duration,
) -> Result<String, AcquisitionTimeout> {
    // Subscribe before the first read so a write landing in between is not
    // missed.
    let mut events = store.subscribe();
    if let Some(token) = store.read() {
        return Ok(token);
    }

    let deadline = Instant::now() + timeout;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                // One last sweep across all tiers catches a backup value
                // that arrived after the final signal.
                debug!("acquisition wait hit its deadline");
                return store.read().ok_or(AcquisitionTimeout);
            }
            event = events.recv() => match event {
                Ok(StoreEvent::AfterWrite) | Err(RecvError::Lagged(_)) => {
                    if let Some(token) = store.read() {
                        return Ok(token);
                    }
                }
                Ok(StoreEvent::BeforeWrite) => {}
                Err(RecvError::Closed) => {
                    return store.read().ok_or(AcquisitionTimeout);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant as StdInstant;

    use super::*;
    use crate::token::tier::MemoryTier;

    fn memory_store() -> Arc<TokenStore> {
        Arc::new(TokenStore::new(
            vec![Box::new(MemoryTier::default()), Box::new(MemoryTier::default())],
            "Bearer",
        ))
    }

    #[tokio::test]
    async fn test_resolves_immediately_when_token_present() {
        let store = memory_store();
        store.write("a.b.c");
        let token = wait_for_token(&store, Duration::from_millis(50))
            .await
            .expect("token");
        assert_eq!(token, "Bearer a.b.c");
    }

    #[tokio::test]
    async fn test_times_out_promptly_with_no_writer() {
        let store = memory_store();
        let started = StdInstant::now();
        let result = wait_for_token(&store, Duration::from_millis(50)).await;
        let elapsed = started.elapsed();

        assert_eq!(result, Err(AcquisitionTimeout));
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(200), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_resolves_on_late_write() {
        let store = memory_store();
        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            writer.write("late.log.in");
        });

        let token = wait_for_token(&store, Duration::from_millis(500))
            .await
            .expect("token");
        assert_eq!(token, "Bearer late.log.in");
    }

    #[tokio::test]
    async fn test_timeout_releases_subscription() {
        let store = memory_store();
        let result = wait_for_token(&store, Duration::from_millis(30)).await;
        assert_eq!(result, Err(AcquisitionTimeout));
        assert_eq!(store.signal_subscribers(), 0);

        // A write after the timeout must not trip anything stale; a fresh
        // wait sees it normally.
        store.write("after.the.fact");
        let token = wait_for_token(&store, Duration::from_millis(50))
            .await
            .expect("token");
        assert_eq!(token, "Bearer after.the.fact");
        assert_eq!(store.signal_subscribers(), 0);
    }

    #[tokio::test]
    async fn test_final_sweep_catches_unsignalled_backup_value() {
        use crate::token::tier::TokenTier;

        // A backup value that arrives with no signal (another context wrote
        // the tier directly) is still found by the deadline sweep.
        let backup = Arc::new(MemoryTier::default());
        let store = Arc::new(TokenStore::new(
            vec![Box::new(MemoryTier::default()), Box::new(backup.clone())],
            "Bearer",
        ));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            backup.store("Bearer raced.in.late").expect("tier store");
        });

        let started = StdInstant::now();
        let token = wait_for_token(&store, Duration::from_millis(100))
            .await
            .expect("token");
        assert_eq!(token, "Bearer raced.in.late");
        // No signal fired, so resolution came from the sweep at the deadline.
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
