//! SeaORM storage backend
//!
//! Implements the link, click and security-log stores on top of SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod clicks;
mod connection;
mod links;
pub mod retry;
mod security_log;

use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::errors::{LinkTrackerError, Result};

pub use connection::{connect_generic, connect_sqlite, run_migrations};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<&'static str> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite")
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql")
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(LinkTrackerError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: &'static str,
    read_retry: retry::ReadRetry,
}

impl SeaOrmStorage {
    /// 建立连接并运行迁移
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let database_url = config.database_url.trim();
        if database_url.is_empty() {
            return Err(LinkTrackerError::database_config("database_url 未设置"));
        }

        let backend_name = infer_backend_from_url(database_url)?;
        let db = if backend_name == "sqlite" {
            let url = if database_url.starts_with("sqlite:") {
                database_url.to_string()
            } else {
                format!("sqlite://{}?mode=rwc", database_url)
            };
            connect_sqlite(&url).await?
        } else {
            connect_generic(database_url, backend_name, config.pool_size, config.timeout).await?
        };

        run_migrations(&db).await?;

        let storage = SeaOrmStorage {
            db,
            backend_name,
            read_retry: retry::ReadRetry::from(config),
        };

        warn!("{} storage initialized.", backend_name.to_uppercase());
        Ok(storage)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
