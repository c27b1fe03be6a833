pub mod query_builder;

use crate::config::AppConfig;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::info;

pub use query_builder::{ColumnKind, QueryBuilder};

/// Pool sizing and timeouts for the row store connection.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }

    /// A private in-memory SQLite database.
    ///
    /// Every `sqlite::memory:` connection opens its own database, so the pool
    /// holds exactly one and never lets it idle out.
    pub fn sqlite_in_memory() -> Self {
        Self {
            max_connections: 1,
            min_connections: 1,
            idle_timeout: Duration::from_secs(3600),
            ..Self::new("sqlite::memory:")
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Opens the connection pool the SQL row store runs on.
pub async fn connect(config: &DbConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    info!(
        backend = ?db.get_database_backend(),
        max_connections = config.max_connections,
        "Row store pool ready"
    );
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, DbBackend};

    #[test]
    fn pool_settings_follow_app_config() {
        let mut cfg = AppConfig::new("postgres://localhost/salon".into(), "test".into());
        cfg.db_max_connections = 4;
        cfg.db_acquire_timeout_secs = 2;

        let db = DbConfig::from(&cfg);

        assert_eq!(db.url, "postgres://localhost/salon");
        assert_eq!(db.max_connections, 4);
        assert_eq!(db.acquire_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn in_memory_sqlite_connects() {
        let db = connect(&DbConfig::sqlite_in_memory()).await.unwrap();
        assert_eq!(db.get_database_backend(), DbBackend::Sqlite);
    }
}
