use std::sync::Arc;

use crm_core::milestone::progress::ProgressCache;
use tokio::sync::RwLock;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: crm_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Progress remembered across complete/reopen transitions. Process-local
    /// and lost on restart.
    pub progress_cache: Arc<RwLock<ProgressCache>>,
}

impl AppState {
    pub fn new(pool: crm_db::DbPool, config: ServerConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            progress_cache: Arc::new(RwLock::new(ProgressCache::new())),
        }
    }
}
