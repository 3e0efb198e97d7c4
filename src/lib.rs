pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod schema;

use config::AppConfig;
use database::Database;
use middleware::RateLimiter;

/// Shared state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Self {
        let limiter = RateLimiter::from_config(&config.api);
        Self { config, db, limiter }
    }
}
