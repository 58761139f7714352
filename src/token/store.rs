//! The token store: single access point for the shared credential.
//!
//! Every component reads and writes the token through this type; nothing
//! else may touch the underlying tiers. Reads resolve tiers in rank order
//! and backfill the durable tier, writes are idempotent and announce
//! themselves on a broadcast channel so the acquisition waiter can react
//! without polling.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::token::tier::TokenTier;

/// Signal channel depth. Writes are rare; a small buffer is plenty and a
/// lagged receiver just re-reads the store.
const SIGNAL_CAPACITY: usize = 16;

/// Lifecycle signals emitted around a real (non-idempotent) write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    BeforeWrite,
    AfterWrite,
}

pub struct TokenStore {
    tiers: Vec<Box<dyn TokenTier>>,
    scheme: String,
    events: broadcast::Sender<StoreEvent>,
}

impl TokenStore {
    /// Build a store over ranked tiers. Tier 0 is durable, tier 1 is the
    /// volatile backup, anything after that is read-only fallback territory.
    pub fn new(tiers: Vec<Box<dyn TokenTier>>, scheme: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            tiers,
            scheme: scheme.into(),
            events,
        }
    }

    /// Subscribe to write signals.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn signal_subscribers(&self) -> usize {
        self.events.receiver_count()
    }

    /// Apply the scheme prefix exactly once.
    fn normalize(&self, raw: &str) -> String {
        let raw = raw.trim();
        let prefix = format!("{} ", self.scheme);
        if raw.starts_with(&prefix) {
            raw.to_string()
        } else {
            format!("{} {}", self.scheme, raw)
        }
    }

    /// Read without side effects. Used by classification so the UI can ask
    /// repeatedly without perturbing storage.
    pub fn peek(&self) -> Option<String> {
        for tier in &self.tiers {
            match tier.load() {
                Ok(Some(token)) if !token.is_empty() => return Some(token),
                Ok(_) => {}
                Err(e) => debug!(tier = tier.name(), error = %e, "token tier read failed"),
            }
        }
        None
    }

    /// Read in rank order; a hit below tier 0 is copied up to the durable
    /// tier before returning so it survives the next restart.
    pub fn read(&self) -> Option<String> {
        for (rank, tier) in self.tiers.iter().enumerate() {
            let token = match tier.load() {
                Ok(Some(token)) if !token.is_empty() => token,
                Ok(_) => continue,
                Err(e) => {
                    debug!(tier = tier.name(), error = %e, "token tier read failed");
                    continue;
                }
            };
            if rank > 0 {
                debug!(tier = tier.name(), "token recovered from backup tier, backfilling");
                if let Err(e) = self.tiers[0].store(&token) {
                    warn!(error = %e, "durable tier backfill failed");
                }
            }
            return Some(token);
        }
        None
    }

    /// Store a token. Writing the value already present is a no-op and emits
    /// no signals, so rotation-header echoes do not cause storage churn.
    pub fn write(&self, raw: &str) {
        if raw.trim().is_empty() {
            debug!("ignoring empty token write");
            return;
        }
        let token = self.normalize(raw);
        if self.read().as_deref() == Some(token.as_str()) {
            return;
        }
        let _ = self.events.send(StoreEvent::BeforeWrite);
        for tier in self.tiers.iter().take(2) {
            if let Err(e) = tier.store(&token) {
                warn!(tier = tier.name(), error = %e, "token tier write failed");
            }
        }
        let _ = self.events.send(StoreEvent::AfterWrite);
        debug!("session token written");
    }

    /// Clear the durable tier; backups too when `include_backups` is set.
    ///
    /// A failed refresh clears only the durable tier so a still-valid backup
    /// can be recovered by a later foreground read before forcing re-login.
    pub fn clear(&self, include_backups: bool) {
        let limit = if include_backups { self.tiers.len() } else { 1 };
        for tier in self.tiers.iter().take(limit) {
            if let Err(e) = tier.clear() {
                warn!(tier = tier.name(), error = %e, "token tier clear failed");
            }
        }
    }
}
