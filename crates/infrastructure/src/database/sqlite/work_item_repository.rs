use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

use bizops_domain::{
    ClientTier, ItemKind, ItemRef, Lifecycle, PriorityCandidate, Project, Task,
    WorkItemRepository, WorkableItem, PROJECT_ENTITY, TASK_ENTITY,
};
use bizops_errors::{BizOpsError, BizOpsResult};

use crate::database::mapping::{
    row_to_candidate, row_to_project, row_to_task, MappingHelpers,
};

/// 任务与项目共用一个仓储，评分与排序只关心两者的公共部分
pub struct SqliteWorkItemRepository {
    pool: SqlitePool,
}

impl SqliteWorkItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn task_snapshot(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<WorkableItem>> {
        // 客户等级优先取任务客户，缺失时回退到父项目的客户
        let row = sqlx::query(
            r#"
            SELECT t.id, t.title, t.deadline, t.status, p.budget AS budget,
                   COALESCE(tc.tier, pc.tier) AS client_tier
            FROM tasks t
            LEFT JOIN projects p ON p.id = t.project_id
            LEFT JOIN clients tc ON tc.id = t.client_id
            LEFT JOIN clients pc ON pc.id = p.client_id
            WHERE t.id = ? AND t.owner_id = ?
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(WorkableItem {
            item: ItemRef::task(row.try_get("id")?),
            title: row.try_get("title")?,
            deadline: row.try_get("deadline")?,
            monetary_value: MappingHelpers::optional_decimal(&row, "budget")?,
            client_tier: MappingHelpers::parsed_text::<ClientTier>(&row, "client_tier")?,
            lifecycle: Lifecycle::Task(row.try_get("status")?),
        }))
    }

    async fn project_snapshot(
        &self,
        owner_id: i64,
        id: i64,
    ) -> BizOpsResult<Option<WorkableItem>> {
        let row = sqlx::query(
            r#"
            SELECT p.id, p.name, p.deadline, p.stage, p.budget, c.tier AS client_tier
            FROM projects p
            LEFT JOIN clients c ON c.id = p.client_id
            WHERE p.id = ? AND p.owner_id = ?
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(WorkableItem {
            item: ItemRef::project(row.try_get("id")?),
            title: row.try_get("name")?,
            deadline: row.try_get("deadline")?,
            monetary_value: MappingHelpers::optional_decimal(&row, "budget")?,
            client_tier: MappingHelpers::parsed_text::<ClientTier>(&row, "client_tier")?,
            lifecycle: Lifecycle::Project(row.try_get("stage")?),
        }))
    }
}

#[async_trait]
impl WorkItemRepository for SqliteWorkItemRepository {
    #[instrument(skip(self, task), fields(task_title = %task.title))]
    async fn create_task(&self, task: &Task) -> BizOpsResult<Task> {
        let result = sqlx::query(
            r#"
            INSERT INTO tasks (owner_id, title, project_id, client_id, status, deadline,
                               priority_score, priority_calculated_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.owner_id)
        .bind(&task.title)
        .bind(task.project_id)
        .bind(task.client_id)
        .bind(task.status)
        .bind(task.deadline)
        .bind(i64::from(task.priority_score))
        .bind(task.priority_calculated_at)
        .bind(task.created_at)
        .execute(&self.pool)
        .await?;

        let mut created = task.clone();
        created.id = result.last_insert_rowid();
        debug!("创建任务成功: {} (ID: {})", created.title, created.id);
        Ok(created)
    }

    #[instrument(skip(self, project), fields(project_name = %project.name))]
    async fn create_project(&self, project: &Project) -> BizOpsResult<Project> {
        let result = sqlx::query(
            r#"
            INSERT INTO projects (owner_id, name, client_id, stage, status, budget, deadline,
                                  priority_score, priority_calculated_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(project.owner_id)
        .bind(&project.name)
        .bind(project.client_id)
        .bind(project.stage)
        .bind(project.status)
        .bind(project.budget.map(|b| b.to_string()))
        .bind(project.deadline)
        .bind(i64::from(project.priority_score))
        .bind(project.priority_calculated_at)
        .bind(project.created_at)
        .execute(&self.pool)
        .await?;

        let mut created = project.clone();
        created.id = result.last_insert_rowid();
        debug!("创建项目成功: {} (ID: {})", created.name, created.id);
        Ok(created)
    }

    async fn find_task(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn find_project(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_project).transpose()
    }

    #[instrument(skip(self, item), fields(item = %item))]
    async fn load_snapshot(
        &self,
        owner_id: i64,
        item: ItemRef,
    ) -> BizOpsResult<Option<WorkableItem>> {
        match item.kind {
            ItemKind::Task => self.task_snapshot(owner_id, item.id).await,
            ItemKind::Project => self.project_snapshot(owner_id, item.id).await,
        }
    }

    #[instrument(skip(self, item), fields(item = %item))]
    async fn persist_score(
        &self,
        owner_id: i64,
        item: ItemRef,
        score: u8,
        calculated_at: DateTime<Utc>,
    ) -> BizOpsResult<()> {
        let (sql, entity) = match item.kind {
            ItemKind::Task => (
                "UPDATE tasks SET priority_score = ?, priority_calculated_at = ? WHERE id = ? AND owner_id = ?",
                TASK_ENTITY,
            ),
            ItemKind::Project => (
                "UPDATE projects SET priority_score = ?, priority_calculated_at = ? WHERE id = ? AND owner_id = ?",
                PROJECT_ENTITY,
            ),
        };
        let result = sqlx::query(sql)
            .bind(i64::from(score))
            .bind(calculated_at)
            .bind(item.id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BizOpsError::not_found(entity, item.id));
        }
        Ok(())
    }

    async fn top_open_tasks(
        &self,
        owner_id: i64,
        limit: usize,
    ) -> BizOpsResult<Vec<PriorityCandidate>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, priority_score, deadline, created_at
            FROM tasks
            WHERE owner_id = ? AND status NOT IN ('COMPLETED', 'CANCELLED')
            ORDER BY priority_score DESC, created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(owner_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row_to_candidate(row, ItemRef::task))
            .collect()
    }

    async fn top_open_projects(
        &self,
        owner_id: i64,
        limit: usize,
    ) -> BizOpsResult<Vec<PriorityCandidate>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name AS title, priority_score, deadline, created_at
            FROM projects
            WHERE owner_id = ? AND status NOT IN ('COMPLETED', 'CANCELLED')
            ORDER BY priority_score DESC, created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(owner_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row_to_candidate(row, ItemRef::project))
            .collect()
    }

    async fn list_open_items(&self, owner_id: i64) -> BizOpsResult<Vec<ItemRef>> {
        let task_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM tasks WHERE owner_id = ? AND status NOT IN ('COMPLETED', 'CANCELLED') ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        let project_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM projects WHERE owner_id = ? AND status NOT IN ('COMPLETED', 'CANCELLED') ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(task_ids
            .into_iter()
            .map(ItemRef::task)
            .chain(project_ids.into_iter().map(ItemRef::project))
            .collect())
    }
}
