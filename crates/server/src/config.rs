use std::env;

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Deployment name baked into rate-limit keys (`development`, `production`, ...).
    pub app_env: String,
    pub redis_url: Option<String>,
    pub rate_limit_namespace: String,
    pub dm_send_limit: LimitSettings,
    pub room_post_limit: LimitSettings,
    pub room_unlock_limit: LimitSettings,
    /// Event rooms open this many hours before the event starts.
    pub room_open_lead_hours: i64,
    /// Event rooms close this many hours after the event ends.
    pub room_close_grace_hours: i64,
}

#[derive(Clone, Copy, Debug)]
pub struct LimitSettings {
    pub max: u32,
    pub window_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT", 3001),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./gather.db".into()),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            rate_limit_namespace: env::var("RATE_LIMIT_NAMESPACE")
                .unwrap_or_else(|_| "gather".into()),
            dm_send_limit: LimitSettings {
                max: parse_var("DM_SEND_LIMIT", 30),
                window_ms: parse_var("DM_SEND_WINDOW_MS", 60_000),
            },
            room_post_limit: LimitSettings {
                max: parse_var("ROOM_POST_LIMIT", 20),
                window_ms: parse_var("ROOM_POST_WINDOW_MS", 60_000),
            },
            room_unlock_limit: LimitSettings {
                max: parse_var("ROOM_UNLOCK_LIMIT", 5),
                window_ms: parse_var("ROOM_UNLOCK_WINDOW_MS", 600_000),
            },
            room_open_lead_hours: parse_var("ROOM_OPEN_LEAD_HOURS", 24),
            room_close_grace_hours: parse_var("ROOM_CLOSE_GRACE_HOURS", 48),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
