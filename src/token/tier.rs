//! Ranked storage tiers for the session token.
//!
//! The durable tier survives a client restart, the memory tier survives a
//! durable-tier eviction within one client instance, and the process-global
//! tier is a last resort that naturally clears on restart. The `TokenStore`
//! decides ranking and backfill; tiers only hold bytes.

use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One place a token may be persisted.
///
/// Implementations must not touch the network and must confine side effects
/// to their own backing storage.
pub trait TokenTier: Send + Sync {
    fn name(&self) -> &'static str;
    fn load(&self) -> Result<Option<String>>;
    fn store(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

// Lets two stores (or a store and a test) share one tier instance.
impl<T: TokenTier> TokenTier for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }
    fn store(&self, token: &str) -> Result<()> {
        (**self).store(token)
    }
    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// Record written to the durable tier.
///
/// `saved_at` lets the client surface "session from N minutes ago" without
/// decoding the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedToken {
    pub token: String,
    pub saved_at: DateTime<Utc>,
}

/// Durable tier: a JSON record on disk, written atomically.
pub struct FileTier {
    path: PathBuf,
}

impl FileTier {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenTier for FileTier {
    fn name(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read token file")?;
        let record: PersistedToken =
            serde_json::from_str(&contents).context("Failed to parse token file")?;
        if record.token.is_empty() {
            return Ok(None);
        }
        Ok(Some(record.token))
    }

    /// Write tmp + rename so a crash mid-write never leaves a torn record.
    ///
    /// The tmp name carries PID and a counter: concurrent saves racing on a
    /// shared `.tmp` can leave trailing bytes from a longer previous write.
    fn store(&self, token: &str) -> Result<()> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let record = PersistedToken {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

/// Volatile backup tier scoped to one store instance.
#[derive(Default)]
pub struct MemoryTier {
    slot: Mutex<Option<String>>,
}

impl MemoryTier {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.slot
            .lock()
            .map_err(|_| anyhow::anyhow!("memory tier lock poisoned"))
    }
}

impl TokenTier for MemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> Result<Option<String>> {
        Ok(self.lock()?.clone())
    }

    fn store(&self, token: &str) -> Result<()> {
        *self.lock()? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

static PROCESS_SLOT: RwLock<Option<String>> = RwLock::new(None);

/// Process-global tier, shared by every store in the process.
pub struct GlobalTier;

impl TokenTier for GlobalTier {
    fn name(&self) -> &'static str {
        "global"
    }

    fn load(&self) -> Result<Option<String>> {
        Ok(PROCESS_SLOT
            .read()
            .map_err(|_| anyhow::anyhow!("global tier lock poisoned"))?
            .clone())
    }

    fn store(&self, token: &str) -> Result<()> {
        *PROCESS_SLOT
            .write()
            .map_err(|_| anyhow::anyhow!("global tier lock poisoned"))? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *PROCESS_SLOT
            .write()
            .map_err(|_| anyhow::anyhow!("global tier lock poisoned"))? = None;
        Ok(())
    }
}
