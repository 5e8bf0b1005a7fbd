use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::store::Hit;

/// In-process counters used when the shared store is unreachable.
///
/// Enforcement through this cache is per instance rather than global.
/// Each key lives for its window; expired keys are dropped on access and
/// by [`LocalCounters::sweep`].
pub struct LocalCounters {
    entries: Mutex<HashMap<String, Counter>>,
    max_entries: usize,
}

struct Counter {
    count: u64,
    expires_at: Instant,
}

impl LocalCounters {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries,
        }
    }

    pub async fn incr(&self, key: &str, window_ms: u64) -> Hit {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            entries.retain(|_, c| c.expires_at > now);
        }

        let counter = entries.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: now + Duration::from_millis(window_ms),
        });

        if counter.expires_at <= now {
            counter.count = 0;
            counter.expires_at = now + Duration::from_millis(window_ms);
        }

        counter.count += 1;

        Hit {
            count: counter.count,
            ttl_ms: counter.expires_at.saturating_duration_since(now).as_millis() as u64,
        }
    }

    /// Drop every expired key. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, c| c.expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
