use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, instrument, warn};

use bizops_domain::{
    AdvancePlan, ObligationStatus, Payment, RecurringPayment, RecurringPaymentRepository,
    OBLIGATION_ENTITY,
};
use bizops_errors::{BizOpsError, BizOpsResult};

use crate::database::mapping::row_to_obligation;

pub struct SqliteRecurringPaymentRepository {
    pool: SqlitePool,
}

impl SqliteRecurringPaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 条件更新未命中时区分"不存在"与"已被修改"
    async fn rejected_update(&self, obligation: &RecurringPayment) -> BizOpsError {
        match self.find_by_id(obligation.owner_id, obligation.id).await {
            Ok(Some(stored)) => BizOpsError::invalid_transition(
                OBLIGATION_ENTITY,
                obligation.id,
                format!("{}@{}", stored.status, stored.next_due_date),
                "update",
            ),
            Ok(None) => BizOpsError::not_found(OBLIGATION_ENTITY, obligation.id),
            Err(e) => e,
        }
    }
}

/// 在事务内插入一笔付款，返回带 ID 的付款
pub(crate) async fn insert_payment(
    tx: &mut Transaction<'_, Sqlite>,
    payment: &Payment,
) -> BizOpsResult<Payment> {
    let result = sqlx::query(
        r#"
        INSERT INTO payments (owner_id, client_id, project_id, recurring_payment_id, amount,
                              status, due_date, paid_at, invoice_number, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payment.owner_id)
    .bind(payment.client_id)
    .bind(payment.project_id)
    .bind(payment.recurring_payment_id)
    .bind(payment.amount.to_string())
    .bind(payment.status)
    .bind(payment.due_date)
    .bind(payment.paid_at)
    .bind(&payment.invoice_number)
    .bind(payment.created_at)
    .execute(&mut **tx)
    .await?;

    let mut created = payment.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

#[async_trait]
impl RecurringPaymentRepository for SqliteRecurringPaymentRepository {
    async fn find_by_id(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<RecurringPayment>> {
        let row = sqlx::query("SELECT * FROM recurring_payments WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_obligation).transpose()
    }

    async fn list(&self, owner_id: i64) -> BizOpsResult<Vec<RecurringPayment>> {
        let rows = sqlx::query(
            "SELECT * FROM recurring_payments WHERE owner_id = ? ORDER BY next_due_date ASC, id ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_obligation).collect()
    }

    /// 账单与首笔付款在同一事务内写入
    #[instrument(skip(self, obligation), fields(client_id = obligation.client_id))]
    async fn create_with_first_payment(
        &self,
        obligation: &RecurringPayment,
    ) -> BizOpsResult<(RecurringPayment, Payment)> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO recurring_payments (owner_id, client_id, name, amount, frequency,
                                            next_due_date, last_paid_date, end_date, status,
                                            external_retainer_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(obligation.owner_id)
        .bind(obligation.client_id)
        .bind(&obligation.name)
        .bind(obligation.amount.to_string())
        .bind(obligation.frequency)
        .bind(obligation.next_due_date)
        .bind(obligation.last_paid_date)
        .bind(obligation.end_date)
        .bind(obligation.status)
        .bind(&obligation.external_retainer_id)
        .bind(obligation.created_at)
        .bind(obligation.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut created = obligation.clone();
        created.id = result.last_insert_rowid();

        let first = Payment::for_obligation(&created, created.next_due_date, created.created_at);
        let payment = insert_payment(&mut tx, &first).await?;

        tx.commit().await?;
        debug!(
            "周期账单 {} 已创建，首笔付款 {} 到期日 {}",
            created.id, payment.id, payment.due_date
        );
        Ok((created, payment))
    }

    /// 条件更新：仅当账单仍为 ACTIVE 且到期日未被其他请求推进时生效
    #[instrument(skip(self, obligation, plan, payment), fields(obligation_id = obligation.id))]
    async fn apply_advance(
        &self,
        obligation: &RecurringPayment,
        plan: AdvancePlan,
        payment: &Payment,
    ) -> BizOpsResult<(RecurringPayment, Payment)> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE recurring_payments
            SET next_due_date = ?, last_paid_date = ?, updated_at = ?
            WHERE id = ? AND owner_id = ? AND status = ? AND next_due_date = ?
            "#,
        )
        .bind(plan.next_due_date)
        .bind(plan.previous_due_date)
        .bind(obligation.updated_at)
        .bind(obligation.id)
        .bind(obligation.owner_id)
        .bind(ObligationStatus::Active)
        .bind(plan.previous_due_date)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            warn!("周期账单 {} 推进冲突，已被并发修改", obligation.id);
            return Err(BizOpsError::invalid_transition(
                OBLIGATION_ENTITY,
                obligation.id,
                format!("{}@{}", obligation.status, plan.previous_due_date),
                "advance",
            ));
        }

        let payment = insert_payment(&mut tx, payment).await?;
        tx.commit().await?;

        Ok((obligation.clone(), payment))
    }

    /// 条件更新：状态与 next_due_date 必须与读取时一致，日期列不在此处写入
    #[instrument(skip(self, obligation), fields(obligation_id = obligation.id))]
    async fn update(
        &self,
        obligation: &RecurringPayment,
        expected_status: ObligationStatus,
    ) -> BizOpsResult<RecurringPayment> {
        let result = sqlx::query(
            r#"
            UPDATE recurring_payments
            SET amount = ?, frequency = ?, end_date = ?, status = ?, updated_at = ?
            WHERE id = ? AND owner_id = ? AND status = ? AND next_due_date = ?
            "#,
        )
        .bind(obligation.amount.to_string())
        .bind(obligation.frequency)
        .bind(obligation.end_date)
        .bind(obligation.status)
        .bind(obligation.updated_at)
        .bind(obligation.id)
        .bind(obligation.owner_id)
        .bind(expected_status)
        .bind(obligation.next_due_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!("周期账单 {} 更新冲突，已被并发修改", obligation.id);
            return Err(self.rejected_update(obligation).await);
        }
        Ok(obligation.clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, owner_id: i64, id: i64) -> BizOpsResult<bool> {
        let result = sqlx::query("DELETE FROM recurring_payments WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
