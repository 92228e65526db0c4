use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use bizops_domain::{Payment, PaymentRepository, PaymentStatus, PAYMENT_ENTITY};
use bizops_errors::{BizOpsError, BizOpsResult};

use crate::database::mapping::{row_to_payment, MappingHelpers};

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 条件更新未命中时区分"不存在"与"状态已变"
    async fn rejected_transition(&self, payment: &Payment, action: &'static str) -> BizOpsError {
        let current: Result<Option<PaymentStatus>, _> =
            sqlx::query_scalar("SELECT status FROM payments WHERE id = ? AND owner_id = ?")
                .bind(payment.id)
                .bind(payment.owner_id)
                .fetch_optional(&self.pool)
                .await;
        match current {
            Ok(Some(status)) => {
                BizOpsError::invalid_transition(PAYMENT_ENTITY, payment.id, status, action)
            }
            Ok(None) => BizOpsError::not_found(PAYMENT_ENTITY, payment.id),
            Err(e) => e.into(),
        }
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn find_by_id(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Payment>> {
        let row = sqlx::query("SELECT * FROM payments WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_payment).transpose()
    }

    async fn list_by_obligation(
        &self,
        owner_id: i64,
        obligation_id: i64,
    ) -> BizOpsResult<Vec<Payment>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM payments
            WHERE owner_id = ? AND recurring_payment_id = ?
            ORDER BY due_date ASC, id ASC
            "#,
        )
        .bind(owner_id)
        .bind(obligation_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn count_by_obligation(&self, obligation_id: i64) -> BizOpsResult<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE recurring_payment_id = ?")
                .bind(obligation_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as usize)
    }

    /// 付款状态与客户累计收入在同一事务内提交；先做条件更新以拿到写锁
    #[instrument(skip(self, payment), fields(payment_id = payment.id, client_id = payment.client_id))]
    async fn mark_paid(&self, payment: &Payment) -> BizOpsResult<Payment> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE payments SET status = ?, paid_at = ?
            WHERE id = ? AND owner_id = ? AND status IN ('PENDING', 'OVERDUE')
            "#,
        )
        .bind(PaymentStatus::Paid)
        .bind(payment.paid_at)
        .bind(payment.id)
        .bind(payment.owner_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.rejected_transition(payment, "mark_paid").await);
        }

        let revenue: Option<String> =
            sqlx::query_scalar("SELECT total_revenue FROM clients WHERE id = ?")
                .bind(payment.client_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(revenue) = revenue else {
            tx.rollback().await?;
            return Err(BizOpsError::database_error(format!(
                "客户不存在: {}",
                payment.client_id
            )));
        };
        let total = MappingHelpers::parse_decimal("total_revenue", &revenue)? + payment.amount;

        sqlx::query("UPDATE clients SET total_revenue = ? WHERE id = ?")
            .bind(total.to_string())
            .bind(payment.client_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("客户 {} 累计收入更新为 {}", payment.client_id, total);
        Ok(payment.clone())
    }

    #[instrument(skip(self, payment), fields(payment_id = payment.id, status = %payment.status))]
    async fn update_status(&self, payment: &Payment) -> BizOpsResult<Payment> {
        let updated = sqlx::query(
            r#"
            UPDATE payments SET status = ?
            WHERE id = ? AND owner_id = ? AND status IN ('PENDING', 'OVERDUE')
            "#,
        )
        .bind(payment.status)
        .bind(payment.id)
        .bind(payment.owner_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(self.rejected_transition(payment, "update_status").await);
        }
        Ok(payment.clone())
    }

    #[instrument(skip(self))]
    async fn mark_overdue(&self, owner_id: i64, today: NaiveDate) -> BizOpsResult<u64> {
        let result = sqlx::query(
            "UPDATE payments SET status = ? WHERE owner_id = ? AND status = ? AND due_date < ?",
        )
        .bind(PaymentStatus::Overdue)
        .bind(owner_id)
        .bind(PaymentStatus::Pending)
        .bind(today)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
