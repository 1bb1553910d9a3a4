//! Rate-limit counter stores.
//!
//! # Responsibilities
//! - Keep per-key request counts within a fixed window
//! - Increment atomically relative to concurrent callers on the same key
//! - Expire windows (background sweep in-process, TTL in Redis)

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;

/// Store operation failure. The limiter treats any of these as a signal
/// to fail open, never to deny.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Counter state for one key.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRecord {
    /// Requests observed in the current window, including this one.
    pub count: u64,
    /// Time until the window resets.
    pub resets_in: Duration,
}

/// Pluggable counter store.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Current record for `key`, if a live window exists.
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError>;

    /// Count one request against `key`. Starts a fresh window of length
    /// `window` when none exists or the previous one expired. Must not
    /// lose updates under concurrent increments of the same key.
    async fn increment(&self, key: &str, window: Duration) -> Result<RateLimitRecord, StoreError>;

    /// Drop the window for `key`.
    async fn reset(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug)]
struct Window {
    count: u64,
    reset_at: Instant,
}

/// In-process store. Correct only within a single instance.
#[derive(Default)]
pub struct MemoryStore {
    windows: DashMap<String, Window>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the background sweep that purges expired windows so memory
    /// stays bounded by the live key set.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => store.sweep(),
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate limit sweeper stopping");
                        break;
                    }
                }
            }
        });
    }

    fn sweep(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, w| w.reset_at > now);
        let removed = before - self.windows.len();
        if removed > 0 {
            tracing::debug!(removed, "Swept expired rate limit windows");
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.windows.len()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let now = Instant::now();
        Ok(self.windows.get(key).and_then(|w| {
            if w.reset_at > now {
                Some(RateLimitRecord {
                    count: w.count,
                    resets_in: w.reset_at - now,
                })
            } else {
                None
            }
        }))
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<RateLimitRecord, StoreError> {
        let now = Instant::now();
        // The entry guard holds the shard lock, so the expiry check and
        // the increment are atomic relative to other callers on this key.
        let mut entry = self.windows.entry(key.to_owned()).or_insert(Window {
            count: 0,
            reset_at: now + window,
        });
        if entry.reset_at <= now {
            entry.count = 0;
            entry.reset_at = now + window;
        }
        entry.count += 1;
        Ok(RateLimitRecord {
            count: entry.count,
            resets_in: entry.reset_at - now,
        })
    }

    async fn reset(&self, key: &str) -> Result<(), StoreError> {
        self.windows.remove(key);
        Ok(())
    }
}

/// One round trip: INCR, set the TTL only when the key is fresh, and read
/// the TTL back. Running as a script keeps the three steps atomic across
/// gateway instances.
const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
return {count, ttl}
"#;

/// Redis-backed store for multi-instance deployments.
pub struct SharedStore {
    conn: redis::aio::ConnectionManager,
    script: redis::Script,
}

impl SharedStore {
    /// Connect to Redis. Fails fast at startup rather than on the first
    /// request.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            script: redis::Script::new(INCREMENT_SCRIPT),
        })
    }
}

#[async_trait]
impl RateLimitStore for SharedStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let (count, ttl_ms): (Option<u64>, i64) = redis::pipe()
            .get(key)
            .pttl(key)
            .query_async(&mut conn)
            .await?;

        Ok(match (count, ttl_ms) {
            (Some(count), ttl_ms) if ttl_ms > 0 => Some(RateLimitRecord {
                count,
                resets_in: Duration::from_millis(ttl_ms as u64),
            }),
            _ => None,
        })
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<RateLimitRecord, StoreError> {
        let mut conn = self.conn.clone();
        let (count, ttl_ms): (u64, i64) = self
            .script
            .key(key)
            .arg(window.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;

        let resets_in = if ttl_ms > 0 {
            Duration::from_millis(ttl_ms as u64)
        } else {
            window
        };
        Ok(RateLimitRecord { count, resets_in })
    }

    async fn reset(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }
}
