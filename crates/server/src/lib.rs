pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod ratelimit;
pub mod routes;
pub mod tasks;

use config::Config;
use ratelimit::AbuseLimiter;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub limiter: AbuseLimiter,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: Config) -> Self {
        let limiter = AbuseLimiter::from_config(&config);
        Self {
            db,
            config,
            limiter,
        }
    }
}
