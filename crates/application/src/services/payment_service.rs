use std::sync::Arc;

use tracing::{info, instrument, warn};

use bizops_core::StructuredLogger;
use bizops_domain::{
    ActivityRecorder, Clock, ObligationEvent, Payment, PaymentRepository,
    RecurringPaymentRepository, OBLIGATION_ENTITY, PAYMENT_ENTITY,
};
use bizops_errors::{BizOpsError, BizOpsResult};

/// 付款状态流转。收款同时计入客户累计收入，两者在同一事务内提交。
pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    obligations: Arc<dyn RecurringPaymentRepository>,
    activity: Arc<dyn ActivityRecorder>,
    clock: Arc<dyn Clock>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        obligations: Arc<dyn RecurringPaymentRepository>,
        activity: Arc<dyn ActivityRecorder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            payments,
            obligations,
            activity,
            clock,
        }
    }

    async fn find(&self, owner_id: i64, id: i64) -> BizOpsResult<Payment> {
        self.payments
            .find_by_id(owner_id, id)
            .await?
            .ok_or_else(|| BizOpsError::not_found(PAYMENT_ENTITY, id))
    }

    /// PENDING / OVERDUE → PAID
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, owner_id: i64, id: i64) -> BizOpsResult<Payment> {
        let mut payment = self.find(owner_id, id).await?;
        let now = self.clock.now();
        payment.mark_paid(now)?;

        let payment = self.payments.mark_paid(&payment).await?;

        StructuredLogger::log_payment_paid(payment.id, payment.client_id, payment.amount);
        let event = ObligationEvent::payment_paid(payment.id, payment.client_id, payment.amount, now);
        if let Err(e) = self.activity.record(&event).await {
            warn!("记录活动失败（已忽略）: {}", e);
        }

        Ok(payment)
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, owner_id: i64, id: i64) -> BizOpsResult<Payment> {
        let mut payment = self.find(owner_id, id).await?;
        payment.cancel()?;
        let payment = self.payments.update_status(&payment).await?;
        info!("{} 已取消", payment.entity_description());
        Ok(payment)
    }

    /// 将过期未付的付款落为 OVERDUE，返回更新条数
    #[instrument(skip(self))]
    pub async fn refresh_overdue(&self, owner_id: i64) -> BizOpsResult<u64> {
        let updated = self
            .payments
            .mark_overdue(owner_id, self.clock.today())
            .await?;
        if updated > 0 {
            info!("{} 笔付款已标记为逾期", updated);
        }
        Ok(updated)
    }

    /// 账单的付款历史，状态按今天计算（过期未付显示为 OVERDUE）
    pub async fn list_for_obligation(
        &self,
        owner_id: i64,
        obligation_id: i64,
    ) -> BizOpsResult<Vec<Payment>> {
        self.obligations
            .find_by_id(owner_id, obligation_id)
            .await?
            .ok_or_else(|| BizOpsError::not_found(OBLIGATION_ENTITY, obligation_id))?;

        let today = self.clock.today();
        let payments = self
            .payments
            .list_by_obligation(owner_id, obligation_id)
            .await?
            .into_iter()
            .map(|mut payment| {
                payment.status = payment.effective_status(today);
                payment
            })
            .collect();
        Ok(payments)
    }
}
