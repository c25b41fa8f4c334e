//! Short-TTL cache of decoded CLI results.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;

/// TTL for most gateway queries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3);

/// TTL for the `gateway health` query.
pub const GATEWAY_HEALTH_TTL: Duration = Duration::from_secs(5);

/// Source of monotonic time for cache freshness checks.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A decoded value and when it was captured.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub captured_at: Instant,
    pub value: Value,
}

/// Process-wide map from logical command key to its last decoded result.
///
/// Entries are replaced wholesale. Stale entries are never purged; they are
/// overwritten by the next miss for the same key.
#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    /// Create an empty cache on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty cache on a custom clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Return the cached value for `key` if it is younger than `ttl`.
    #[must_use]
    pub fn get(&self, key: &str, ttl: Duration) -> Option<Value> {
        let now = self.clock.now();
        let entries = self.lock();
        let entry = entries.get(key)?;
        (now.saturating_duration_since(entry.captured_at) < ttl).then(|| entry.value.clone())
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: impl Into<String>, value: Value) {
        let entry = CacheEntry {
            captured_at: self.clock.now(),
            value,
        };
        self.lock().insert(key.into(), entry);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // Writers replace whole entries, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
