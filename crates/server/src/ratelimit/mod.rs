//! Abuse limiting for write paths.
//!
//! Counters live in the shared store under
//! `{namespace}:{env}:{class}:{scope}:{identity}` and expire with their
//! window. When the shared store cannot be reached the limiter keeps
//! counting in a local cache, so limits still hold per instance.

mod local;
mod store;

pub use local::LocalCounters;
pub use store::{CounterStore, Hit, StoreUnavailable};

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, LimitSettings};
use crate::error::{AppError, AppResult};

const LOCAL_CACHE_CAPACITY: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitClass {
    DmSend,
    RoomPost,
    RoomUnlock,
}

impl LimitClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DmSend => "dm_send",
            Self::RoomPost => "room_post",
            Self::RoomUnlock => "room_unlock",
        }
    }
}

pub struct AbuseLimiter {
    store: Arc<CounterStore>,
    local: Arc<LocalCounters>,
    prefix: String,
    dm_send: LimitSettings,
    room_post: LimitSettings,
    room_unlock: LimitSettings,
}

impl AbuseLimiter {
    pub fn new(store: Arc<CounterStore>, local: Arc<LocalCounters>, config: &Config) -> Self {
        Self {
            store,
            local,
            prefix: format!("{}:{}", config.rate_limit_namespace, config.app_env),
            dm_send: config.dm_send_limit,
            room_post: config.room_post_limit,
            room_unlock: config.room_unlock_limit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(CounterStore::new(config.redis_url.clone())),
            Arc::new(LocalCounters::new(LOCAL_CACHE_CAPACITY)),
            config,
        )
    }

    pub fn local_counters(&self) -> Arc<LocalCounters> {
        self.local.clone()
    }

    fn settings(&self, class: LimitClass) -> LimitSettings {
        match class {
            LimitClass::DmSend => self.dm_send,
            LimitClass::RoomPost => self.room_post,
            LimitClass::RoomUnlock => self.room_unlock,
        }
    }

    pub fn key(&self, class: LimitClass, scope: &str, identity: &str) -> String {
        format!("{}:{}:{}:{}", self.prefix, class.as_str(), scope, identity)
    }

    /// Count one call for `identity` within `scope`, refusing it once the
    /// class limit for the current window is exceeded.
    pub async fn check(&self, class: LimitClass, scope: &str, identity: &str) -> AppResult<()> {
        let settings = self.settings(class);
        let key = self.key(class, scope, identity);

        let hit = match self.store.incr(&key, settings.window_ms).await {
            Ok(hit) => hit,
            Err(StoreUnavailable::NotConfigured) | Err(StoreUnavailable::CoolingDown) => {
                self.local.incr(&key, settings.window_ms).await
            }
            Err(e) => {
                tracing::warn!(error = %e, class = class.as_str(), "Rate-limit store failed, counting locally");
                self.local.incr(&key, settings.window_ms).await
            }
        };

        if hit.count > u64::from(settings.max) {
            tracing::warn!(
                event = "rate_limit",
                class = class.as_str(),
                scope = %scope,
                identity = %identity
            );
            return Err(AppError::RateLimited {
                class: class.as_str(),
                scope: scope.to_string(),
                retry_after_secs: hit.ttl_ms.div_ceil(1000).max(1),
            });
        }

        Ok(())
    }
}

/// Periodically evict expired local counters.
pub fn spawn_local_sweeper(local: Arc<LocalCounters>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = local.sweep().await;
            if removed > 0 {
                tracing::debug!(removed, "Swept expired local rate-limit counters");
            }
        }
    })
}
