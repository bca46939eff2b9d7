use sqlx::SqlitePool;

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}
