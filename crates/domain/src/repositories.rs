//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则。
//! 所有查询都带 `owner_id`，不属于调用方的记录按"不存在"处理。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::entities::{
    AdvancePlan, Client, Payment, PriorityCandidate, Project, RecurringPayment, Task, WorkableItem,
};
use crate::value_objects::{ItemRef, ObligationStatus};
use bizops_errors::BizOpsResult;

/// 客户仓储抽象
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create(&self, client: &Client) -> BizOpsResult<Client>;
    async fn find_by_id(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Client>>;
}

/// 任务 / 项目仓储抽象（只包含评分与排序需要的操作）
#[async_trait]
pub trait WorkItemRepository: Send + Sync {
    async fn create_task(&self, task: &Task) -> BizOpsResult<Task>;
    async fn create_project(&self, project: &Project) -> BizOpsResult<Project>;
    async fn find_task(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Task>>;
    async fn find_project(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Project>>;
    /// 组装评分快照：任务取父项目预算，客户等级取任务客户，缺失时回退到项目客户
    async fn load_snapshot(&self, owner_id: i64, item: ItemRef)
        -> BizOpsResult<Option<WorkableItem>>;
    /// 写回分数，后写者覆盖；条目不属于 `owner_id` 时返回 NotFound 且不写入
    async fn persist_score(
        &self,
        owner_id: i64,
        item: ItemRef,
        score: u8,
        calculated_at: DateTime<Utc>,
    ) -> BizOpsResult<()>;
    /// 未完成任务，按 分数降序、创建时间升序、ID升序
    async fn top_open_tasks(&self, owner_id: i64, limit: usize)
        -> BizOpsResult<Vec<PriorityCandidate>>;
    async fn top_open_projects(
        &self,
        owner_id: i64,
        limit: usize,
    ) -> BizOpsResult<Vec<PriorityCandidate>>;
    async fn list_open_items(&self, owner_id: i64) -> BizOpsResult<Vec<ItemRef>>;
}

/// 周期账单仓储抽象
///
/// 多行写入的方法必须在同一事务内完成，任何一步失败都整体回滚。
#[async_trait]
pub trait RecurringPaymentRepository: Send + Sync {
    async fn find_by_id(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<RecurringPayment>>;
    async fn list(&self, owner_id: i64) -> BizOpsResult<Vec<RecurringPayment>>;
    /// 插入账单并生成首笔付款（到期日 = next_due_date）
    async fn create_with_first_payment(
        &self,
        obligation: &RecurringPayment,
    ) -> BizOpsResult<(RecurringPayment, Payment)>;
    /// 推进一个账期：更新账单日期并插入新付款。
    /// 若账单已不再是 ACTIVE 或 next_due_date 已被他人推进，返回状态错误且不写入任何数据。
    async fn apply_advance(
        &self,
        obligation: &RecurringPayment,
        plan: AdvancePlan,
        payment: &Payment,
    ) -> BizOpsResult<(RecurringPayment, Payment)>;
    /// 只写状态与条款列（金额、频率、结束日期）。
    /// 库中状态须仍为 `expected_status` 且 next_due_date 未被推进，否则返回状态错误且不写入。
    async fn update(
        &self,
        obligation: &RecurringPayment,
        expected_status: ObligationStatus,
    ) -> BizOpsResult<RecurringPayment>;
    async fn delete(&self, owner_id: i64, id: i64) -> BizOpsResult<bool>;
}

/// 付款仓储抽象
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_id(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Payment>>;
    async fn list_by_obligation(&self, owner_id: i64, obligation_id: i64)
        -> BizOpsResult<Vec<Payment>>;
    async fn count_by_obligation(&self, obligation_id: i64) -> BizOpsResult<usize>;
    /// 标记已付并把金额计入客户累计收入，同一事务
    async fn mark_paid(&self, payment: &Payment) -> BizOpsResult<Payment>;
    async fn update_status(&self, payment: &Payment) -> BizOpsResult<Payment>;
    /// 把已过期的 PENDING 付款落为 OVERDUE，返回受影响行数
    async fn mark_overdue(&self, owner_id: i64, today: NaiveDate) -> BizOpsResult<u64>;
}
