//! SQLite-backed repository implementations.

mod posts;
mod util;

pub use util::map_sqlx_error;

use std::{str::FromStr, sync::Arc, time::Duration};

use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};

use crate::config::DatabaseSettings;
use crate::infra::error::InfraError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SqliteRepositories {
    pool: Arc<SqlitePool>,
}

impl SqliteRepositories {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a pool for `settings.url`, creating the database file if needed.
    pub async fn connect(settings: &DatabaseSettings) -> Result<SqlitePool, InfraError> {
        let options = SqliteConnectOptions::from_str(&settings.url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections.get())
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }
}
