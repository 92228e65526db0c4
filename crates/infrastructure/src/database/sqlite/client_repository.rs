use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use bizops_domain::{Client, ClientRepository};
use bizops_errors::BizOpsResult;

use crate::database::mapping::row_to_client;

pub struct SqliteClientRepository {
    pool: SqlitePool,
}

impl SqliteClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for SqliteClientRepository {
    #[instrument(skip(self, client), fields(client_name = %client.name))]
    async fn create(&self, client: &Client) -> BizOpsResult<Client> {
        let result = sqlx::query(
            "INSERT INTO clients (owner_id, name, tier, total_revenue, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(client.owner_id)
        .bind(&client.name)
        .bind(client.tier)
        .bind(client.total_revenue.to_string())
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        let mut created = client.clone();
        created.id = result.last_insert_rowid();
        debug!("创建客户成功: {} (ID: {})", created.name, created.id);
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Client>> {
        let row = sqlx::query("SELECT * FROM clients WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_client).transpose()
    }
}
