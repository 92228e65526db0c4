//! 周期账单调度
//!
//! 创建、状态变更和条款修改遵循"先同步远端，再提交本地"：远端调用失败时本地不写入。
//! 推进账期只在本地进行，开票服务按自己的时间表出票。

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use bizops_core::{MetricsRecorder, StructuredLogger};
use bizops_domain::{
    ActivityRecorder, BillingGateway, Clock, ClientRepository, Frequency, NewObligation,
    ObligationAction, ObligationEvent, ObligationStatus, ObligationTermsUpdate, Payment,
    PaymentRepository, RecurringPayment, RecurringPaymentRepository, RetainerDocument,
    RetainerSpec, RetainerUpdate, CLIENT_ENTITY, OBLIGATION_ENTITY,
};
use bizops_errors::{BizOpsError, BizOpsResult};

#[derive(Debug, Clone, Serialize)]
pub struct AdvanceOutcome {
    pub obligation: RecurringPayment,
    pub payment: Payment,
}

pub struct RecurringService {
    obligations: Arc<dyn RecurringPaymentRepository>,
    payments: Arc<dyn PaymentRepository>,
    clients: Arc<dyn ClientRepository>,
    billing: Arc<dyn BillingGateway>,
    activity: Arc<dyn ActivityRecorder>,
    clock: Arc<dyn Clock>,
    metrics: MetricsRecorder,
}

impl RecurringService {
    pub fn new(
        obligations: Arc<dyn RecurringPaymentRepository>,
        payments: Arc<dyn PaymentRepository>,
        clients: Arc<dyn ClientRepository>,
        billing: Arc<dyn BillingGateway>,
        activity: Arc<dyn ActivityRecorder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            obligations,
            payments,
            clients,
            billing,
            activity,
            clock,
            metrics: MetricsRecorder::new(),
        }
    }

    pub async fn get(&self, owner_id: i64, id: i64) -> BizOpsResult<RecurringPayment> {
        self.obligations
            .find_by_id(owner_id, id)
            .await?
            .ok_or_else(|| BizOpsError::not_found(OBLIGATION_ENTITY, id))
    }

    pub async fn list(&self, owner_id: i64) -> BizOpsResult<Vec<RecurringPayment>> {
        self.obligations.list(owner_id).await
    }

    /// 新建账单并生成首笔付款
    #[instrument(skip(self, request), fields(client_id = request.client_id))]
    pub async fn create(
        &self,
        owner_id: i64,
        request: NewObligation,
    ) -> BizOpsResult<(RecurringPayment, Payment)> {
        request.validate()?;
        self.ensure_frequency_supported(request.frequency)?;
        self.clients
            .find_by_id(owner_id, request.client_id)
            .await?
            .ok_or_else(|| BizOpsError::not_found(CLIENT_ENTITY, request.client_id))?;

        let mut obligation = RecurringPayment::from_new(owner_id, &request, self.clock.now());

        let retainer_id = self
            .billing
            .create_retainer(&RetainerSpec::from(&obligation))
            .await
            .map_err(|e| self.sync_failed("create_retainer", None, e))?;
        obligation.external_retainer_id = retainer_id.clone();

        let (obligation, payment) = match self.obligations.create_with_first_payment(&obligation).await
        {
            Ok(created) => created,
            Err(e) => {
                if let Some(retainer_id) = retainer_id {
                    self.compensate_remote_create(&retainer_id).await;
                }
                return Err(e);
            }
        };

        StructuredLogger::log_obligation_created(
            obligation.id,
            owner_id,
            payment.id,
            obligation.external_retainer_id.as_deref(),
        );
        self.record(ObligationEvent::created(
            obligation.id,
            payment.id,
            self.clock.now(),
        ))
        .await;

        Ok((obligation, payment))
    }

    /// 推进一个账期：记录上次到期日、滚动到下一到期日并生成新的待付款
    #[instrument(skip(self))]
    pub async fn advance(&self, owner_id: i64, id: i64) -> BizOpsResult<AdvanceOutcome> {
        let mut obligation = self.get(owner_id, id).await?;
        let plan = obligation.plan_advance()?;

        let now = self.clock.now();
        obligation.apply_advance(plan, now);
        let payment = Payment::for_obligation(&obligation, plan.next_due_date, now);

        let (obligation, payment) = self
            .obligations
            .apply_advance(&obligation, plan, &payment)
            .await?;

        self.metrics.record_obligation_advanced();
        StructuredLogger::log_obligation_advanced(
            obligation.id,
            payment.id,
            plan.previous_due_date,
            plan.next_due_date,
        );
        self.record(ObligationEvent::advanced(
            obligation.id,
            payment.id,
            plan.next_due_date,
            now,
        ))
        .await;

        Ok(AdvanceOutcome {
            obligation,
            payment,
        })
    }

    pub async fn pause(&self, owner_id: i64, id: i64) -> BizOpsResult<RecurringPayment> {
        self.transition(owner_id, id, ObligationAction::Pause).await
    }

    /// 恢复后 next_due_date 保持不变，可能已在过去
    pub async fn resume(&self, owner_id: i64, id: i64) -> BizOpsResult<RecurringPayment> {
        self.transition(owner_id, id, ObligationAction::Resume).await
    }

    pub async fn cancel(&self, owner_id: i64, id: i64) -> BizOpsResult<RecurringPayment> {
        self.transition(owner_id, id, ObligationAction::Cancel).await
    }

    pub async fn complete(&self, owner_id: i64, id: i64) -> BizOpsResult<RecurringPayment> {
        self.transition(owner_id, id, ObligationAction::Complete).await
    }

    #[instrument(skip(self, action), fields(action = action.as_str()))]
    async fn transition(
        &self,
        owner_id: i64,
        id: i64,
        action: ObligationAction,
    ) -> BizOpsResult<RecurringPayment> {
        let mut obligation = self.get(owner_id, id).await?;
        let from = obligation.status;
        let target = obligation.transition_target(action)?;

        self.sync_update(&obligation, &RetainerUpdate::status(target), "update_retainer_status")
            .await?;

        obligation.apply_status(target, self.clock.now());
        let obligation = self
            .commit_update(&obligation, from, RetainerUpdate::status(from), "update_retainer_status")
            .await?;

        StructuredLogger::log_obligation_state_changed(
            obligation.id,
            from.as_str(),
            target.as_str(),
        );
        self.record(ObligationEvent::status_changed(
            obligation.id,
            from,
            target,
            self.clock.now(),
        ))
        .await;

        Ok(obligation)
    }

    /// 修改金额 / 频率 / 结束日期；next_due_date 不重新计算
    #[instrument(skip(self, terms))]
    pub async fn update_terms(
        &self,
        owner_id: i64,
        id: i64,
        terms: ObligationTermsUpdate,
    ) -> BizOpsResult<RecurringPayment> {
        let mut obligation = self.get(owner_id, id).await?;
        obligation.ensure_terms_editable()?;
        terms.validate(&obligation)?;
        if let Some(frequency) = terms.frequency {
            self.ensure_frequency_supported(frequency)?;
        }

        self.sync_update(&obligation, &RetainerUpdate::from(&terms), "update_retainer_terms")
            .await?;

        let revert = RetainerUpdate::revert_terms(&obligation, &terms);
        let expected = obligation.status;
        obligation.apply_terms(&terms, self.clock.now());
        let obligation = self
            .commit_update(&obligation, expected, revert, "update_retainer_terms")
            .await?;

        info!("周期账单 {} 条款已更新", obligation.id);
        self.record(ObligationEvent::terms_updated(obligation.id, self.clock.now()))
            .await;

        Ok(obligation)
    }

    /// 已产生付款记录的账单不能删除，只能取消
    #[instrument(skip(self))]
    pub async fn delete(&self, owner_id: i64, id: i64) -> BizOpsResult<()> {
        let obligation = self.get(owner_id, id).await?;
        let payment_count = self.payments.count_by_obligation(obligation.id).await?;
        if payment_count > 0 {
            return Err(BizOpsError::DeletionRejected {
                id: obligation.id,
                payment_count,
            });
        }

        if !obligation.status.is_terminal() {
            self.sync_update(
                &obligation,
                &RetainerUpdate::status(ObligationStatus::Cancelled),
                "cancel_retainer",
            )
            .await?;
        }

        if !self.obligations.delete(owner_id, obligation.id).await? {
            return Err(BizOpsError::not_found(OBLIGATION_ENTITY, obligation.id));
        }
        info!("周期账单 {} 已删除", obligation.id);
        Ok(())
    }

    /// 开票服务按该 retainer 生成的单据；未同步的账单返回空列表
    #[instrument(skip(self))]
    pub async fn retainer_documents(
        &self,
        owner_id: i64,
        id: i64,
    ) -> BizOpsResult<Vec<RetainerDocument>> {
        let obligation = self.get(owner_id, id).await?;
        match obligation.external_retainer_id.as_deref() {
            Some(retainer_id) => self
                .billing
                .retainer_documents(retainer_id)
                .await
                .map_err(|e| self.sync_failed("retainer_documents", Some(obligation.id), e)),
            None => Ok(Vec::new()),
        }
    }

    fn ensure_frequency_supported(&self, frequency: Frequency) -> BizOpsResult<()> {
        if !self.billing.supports_frequency(frequency) {
            return Err(BizOpsError::validation_error(format!(
                "开票服务 {} 不支持频率 {}",
                self.billing.name(),
                frequency
            )));
        }
        Ok(())
    }

    async fn sync_update(
        &self,
        obligation: &RecurringPayment,
        update: &RetainerUpdate,
        operation: &'static str,
    ) -> BizOpsResult<()> {
        let Some(retainer_id) = obligation.external_retainer_id.as_deref() else {
            return Ok(());
        };
        self.billing
            .update_retainer(retainer_id, update)
            .await
            .map_err(|e| self.sync_failed(operation, Some(obligation.id), e))
    }

    fn sync_failed(
        &self,
        operation: &'static str,
        obligation_id: Option<i64>,
        error: BizOpsError,
    ) -> BizOpsError {
        self.metrics.record_billing_sync_failure(operation);
        StructuredLogger::log_billing_sync_failed(operation, obligation_id, &error.to_string());
        error
    }

    /// 远端已同步后提交本地；本地失败（含并发冲突）时按 `revert` 回滚远端并返回原错误
    async fn commit_update(
        &self,
        obligation: &RecurringPayment,
        expected: ObligationStatus,
        revert: RetainerUpdate,
        operation: &'static str,
    ) -> BizOpsResult<RecurringPayment> {
        match self.obligations.update(obligation, expected).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                self.metrics.record_billing_sync_failure(operation);
                StructuredLogger::log_billing_divergence(operation, obligation.id, &e.to_string());
                if let Some(retainer_id) = obligation.external_retainer_id.as_deref() {
                    self.compensate_remote_update(retainer_id, &revert).await;
                }
                Err(e)
            }
        }
    }

    async fn compensate_remote_update(&self, retainer_id: &str, revert: &RetainerUpdate) {
        if revert.is_empty() {
            error!(
                "本地写入失败，远端 retainer {} 的条款无法自动回滚，需要人工处理",
                retainer_id
            );
            return;
        }
        match self.billing.update_retainer(retainer_id, revert).await {
            Ok(()) => warn!("本地写入失败，已回滚远端 retainer {}", retainer_id),
            Err(e) => {
                self.metrics.record_billing_sync_failure("compensate_update");
                error!(
                    "本地写入失败且回滚远端 retainer {} 失败，需要人工处理: {}",
                    retainer_id, e
                );
            }
        }
    }

    async fn compensate_remote_create(&self, retainer_id: &str) {
        let cancel = RetainerUpdate::status(ObligationStatus::Cancelled);
        match self.billing.update_retainer(retainer_id, &cancel).await {
            Ok(()) => warn!("本地写入失败，已取消远端 retainer {}", retainer_id),
            Err(e) => {
                self.metrics.record_billing_sync_failure("compensate_create");
                error!(
                    "本地写入失败且取消远端 retainer {} 失败，需要人工处理: {}",
                    retainer_id, e
                );
            }
        }
    }

    async fn record(&self, event: ObligationEvent) {
        if let Err(e) = self.activity.record(&event).await {
            warn!("记录活动失败（已忽略）: {}", e);
        }
    }
}
