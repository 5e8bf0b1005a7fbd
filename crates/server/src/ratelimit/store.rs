use redis::aio::ConnectionManager;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// INCR and set the expiry on the first hit in one round trip, then
/// report the remaining lifetime so callers can compute a retry delay.
const INCR_WITH_EXPIRY: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
return {count, ttl}
";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const RECONNECT_COOLDOWN: Duration = Duration::from_secs(30);

/// Counter value after an increment and the time left in its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub count: u64,
    pub ttl_ms: u64,
}

#[derive(Debug, Error)]
pub enum StoreUnavailable {
    #[error("no shared counter store configured")]
    NotConfigured,

    #[error("shared counter store unreachable (retrying later)")]
    CoolingDown,

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("command failed: {0}")]
    Command(#[from] redis::RedisError),
}

/// Process-wide handle to the shared counter service.
///
/// The connection is established on first use and then reused by every
/// request. A failed connect is not retried until the cooldown passes.
pub struct CounterStore {
    url: Option<String>,
    conn: RwLock<Option<ConnectionManager>>,
    last_failure: Mutex<Option<Instant>>,
    script: redis::Script,
}

impl CounterStore {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            conn: RwLock::new(None),
            last_failure: Mutex::new(None),
            script: redis::Script::new(INCR_WITH_EXPIRY),
        }
    }

    /// Atomically increment `key`, starting a `window_ms` expiry on the first hit.
    pub async fn incr(&self, key: &str, window_ms: u64) -> Result<Hit, StoreUnavailable> {
        let mut conn = self.connection().await?;

        let (count, ttl): (u64, i64) = self
            .script
            .key(key)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await?;

        Ok(Hit {
            count,
            ttl_ms: u64::try_from(ttl).unwrap_or(window_ms),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreUnavailable> {
        let url = self.url.as_deref().ok_or(StoreUnavailable::NotConfigured)?;

        if let Some(conn) = self.conn.read().await.as_ref() {
            return Ok(conn.clone());
        }

        // Serialize connect attempts so a burst of requests opens one connection.
        let mut last_failure = self.last_failure.lock().await;

        if let Some(conn) = self.conn.read().await.as_ref() {
            return Ok(conn.clone());
        }

        if let Some(at) = *last_failure {
            if at.elapsed() < RECONNECT_COOLDOWN {
                return Err(StoreUnavailable::CoolingDown);
            }
        }

        match connect(url).await {
            Ok(conn) => {
                tracing::info!("Connected to shared rate-limit store");
                *self.conn.write().await = Some(conn.clone());
                *last_failure = None;
                Ok(conn)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Shared rate-limit store unavailable, counting locally");
                *last_failure = Some(Instant::now());
                Err(e)
            }
        }
    }
}

async fn connect(url: &str) -> Result<ConnectionManager, StoreUnavailable> {
    let client = redis::Client::open(url).map_err(|e| StoreUnavailable::Connect(e.to_string()))?;

    match tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client)).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(StoreUnavailable::Connect(e.to_string())),
        Err(_) => Err(StoreUnavailable::Connect("timed out".into())),
    }
}
