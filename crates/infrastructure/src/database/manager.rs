use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use bizops_core::DatabaseConfig;
use bizops_errors::BizOpsResult;

use super::migrations::run_migrations;
use super::sqlite::{
    SqliteClientRepository, SqlitePaymentRepository, SqliteRecurringPaymentRepository,
    SqliteWorkItemRepository,
};

/// SQLite 连接池及仓储工厂
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> BizOpsResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // 内存库每个连接都是独立的数据库，只能保留一个长期连接
        let pool = if config.url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options)
                .await?
        };

        info!("数据库连接池已创建: {}", config.url);
        Ok(Self { pool })
    }

    /// 测试用内存库，已执行迁移
    pub async fn in_memory() -> BizOpsResult<Self> {
        let manager = Self::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await?;
        manager.migrate().await?;
        Ok(manager)
    }

    pub async fn migrate(&self) -> BizOpsResult<()> {
        run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn client_repository(&self) -> Arc<SqliteClientRepository> {
        Arc::new(SqliteClientRepository::new(self.pool.clone()))
    }

    pub fn work_item_repository(&self) -> Arc<SqliteWorkItemRepository> {
        Arc::new(SqliteWorkItemRepository::new(self.pool.clone()))
    }

    pub fn recurring_payment_repository(&self) -> Arc<SqliteRecurringPaymentRepository> {
        Arc::new(SqliteRecurringPaymentRepository::new(self.pool.clone()))
    }

    pub fn payment_repository(&self) -> Arc<SqlitePaymentRepository> {
        Arc::new(SqlitePaymentRepository::new(self.pool.clone()))
    }

    pub async fn health_check(&self) -> BizOpsResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        debug!("数据库健康检查通过");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("数据库连接池已关闭");
    }
}
