use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::value_objects::{
    ClientTier, Frequency, ItemRef, ObligationStatus, PaymentStatus, ProjectStage, ProjectStatus,
    TaskStatus, UrgencyLevel,
};
use bizops_errors::{BizOpsError, BizOpsResult};

pub const OBLIGATION_ENTITY: &str = "周期账单";
pub const PAYMENT_ENTITY: &str = "付款";
pub const CLIENT_ENTITY: &str = "客户";
pub const TASK_ENTITY: &str = "任务";
pub const PROJECT_ENTITY: &str = "项目";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub tier: ClientTier,
    pub total_revenue: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(owner_id: i64, name: String, tier: ClientTier) -> Self {
        Self {
            id: 0, // 将由数据库生成
            owner_id,
            name,
            tier,
            total_revenue: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub project_id: Option<i64>,
    pub client_id: Option<i64>,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub priority_score: u8,
    pub priority_calculated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(owner_id: i64, title: String) -> Self {
        Self {
            id: 0,
            owner_id,
            title,
            project_id: None,
            client_id: None,
            status: TaskStatus::Todo,
            deadline: None,
            priority_score: 0,
            priority_calculated_at: None,
            created_at: Utc::now(),
        }
    }
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub client_id: Option<i64>,
    pub stage: ProjectStage,
    pub status: ProjectStatus,
    pub budget: Option<Decimal>,
    pub deadline: Option<DateTime<Utc>>,
    pub priority_score: u8,
    pub priority_calculated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(owner_id: i64, name: String) -> Self {
        Self {
            id: 0,
            owner_id,
            name,
            client_id: None,
            stage: ProjectStage::Planning,
            status: ProjectStatus::Active,
            budget: None,
            deadline: None,
            priority_score: 0,
            priority_calculated_at: None,
            created_at: Utc::now(),
        }
    }
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// 评分所需的生命周期信息
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Lifecycle {
    Task(TaskStatus),
    Project(ProjectStage),
}

/// 评分快照：任务的金额取父项目预算，客户等级取关联客户
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkableItem {
    pub item: ItemRef,
    pub title: String,
    pub deadline: Option<DateTime<Utc>>,
    pub monetary_value: Option<Decimal>,
    pub client_tier: Option<ClientTier>,
    pub lifecycle: Lifecycle,
}

/// 排序候选，读取的是已存储的分数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityCandidate {
    pub item: ItemRef,
    pub title: String,
    pub priority_score: u8,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedItem {
    pub item: ItemRef,
    pub title: String,
    pub score: u8,
    pub deadline: Option<DateTime<Utc>>,
    pub urgency_level: UrgencyLevel,
}

impl From<PriorityCandidate> for RankedItem {
    fn from(candidate: PriorityCandidate) -> Self {
        Self {
            urgency_level: UrgencyLevel::from_score(candidate.priority_score),
            item: candidate.item,
            title: candidate.title,
            score: candidate.priority_score,
            deadline: candidate.deadline,
        }
    }
}

/// 周期账单上的生命周期动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObligationAction {
    Pause,
    Resume,
    Cancel,
    Complete,
}

impl ObligationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObligationAction::Pause => "pause",
            ObligationAction::Resume => "resume",
            ObligationAction::Cancel => "cancel",
            ObligationAction::Complete => "complete",
        }
    }
}

/// 周期账单（长期计费约定）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringPayment {
    pub id: i64,
    pub owner_id: i64,
    pub client_id: i64,
    pub name: String,
    pub amount: Decimal,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
    pub last_paid_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ObligationStatus,
    pub external_retainer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 一次推进的计算结果，尚未落库
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvancePlan {
    pub previous_due_date: NaiveDate,
    pub next_due_date: NaiveDate,
}

impl RecurringPayment {
    pub fn from_new(owner_id: i64, new: &NewObligation, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            owner_id,
            client_id: new.client_id,
            name: new.name.trim().to_string(),
            amount: new.amount,
            frequency: new.frequency,
            next_due_date: new.next_due_date,
            last_paid_date: None,
            end_date: new.end_date,
            status: ObligationStatus::Active,
            external_retainer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ObligationStatus::Active)
    }

    /// 计算下一账期；非激活或超出结束日期时拒绝
    pub fn plan_advance(&self) -> BizOpsResult<AdvancePlan> {
        if !self.is_active() {
            return Err(BizOpsError::ObligationNotActive {
                id: self.id,
                status: self.status.to_string(),
            });
        }
        let next_due_date = calendar::roll_forward(self.next_due_date, self.frequency)?;
        if let Some(end_date) = self.end_date {
            if next_due_date > end_date {
                return Err(BizOpsError::invalid_transition(
                    OBLIGATION_ENTITY,
                    self.id,
                    format!("{} (结束日期 {end_date})", self.status),
                    "advance",
                ));
            }
        }
        Ok(AdvancePlan {
            previous_due_date: self.next_due_date,
            next_due_date,
        })
    }

    pub fn apply_advance(&mut self, plan: AdvancePlan, now: DateTime<Utc>) {
        self.last_paid_date = Some(plan.previous_due_date);
        self.next_due_date = plan.next_due_date;
        self.updated_at = now;
    }

    /// 校验状态迁移并返回目标状态，不修改自身
    pub fn transition_target(&self, action: ObligationAction) -> BizOpsResult<ObligationStatus> {
        use ObligationStatus::*;
        let target = match (self.status, action) {
            (Active, ObligationAction::Pause) => Paused,
            (Paused, ObligationAction::Resume) => Active,
            (Active | Paused, ObligationAction::Cancel) => Cancelled,
            (Active, ObligationAction::Complete) => Completed,
            (from, action) => {
                return Err(BizOpsError::invalid_transition(
                    OBLIGATION_ENTITY,
                    self.id,
                    from,
                    action.as_str(),
                ))
            }
        };
        Ok(target)
    }

    /// 只改状态；恢复时 next_due_date 保持暂停前的值
    pub fn apply_status(&mut self, status: ObligationStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub fn ensure_terms_editable(&self) -> BizOpsResult<()> {
        if self.status.is_terminal() {
            return Err(BizOpsError::invalid_transition(
                OBLIGATION_ENTITY,
                self.id,
                self.status,
                "update_terms",
            ));
        }
        Ok(())
    }

    pub fn apply_terms(&mut self, terms: &ObligationTermsUpdate, now: DateTime<Utc>) {
        if let Some(amount) = terms.amount {
            self.amount = amount;
        }
        if let Some(frequency) = terms.frequency {
            self.frequency = frequency;
        }
        if let Some(end_date) = terms.end_date {
            self.end_date = Some(end_date);
        }
        self.updated_at = now;
    }
}

fn validate_amount(amount: Decimal) -> BizOpsResult<()> {
    if amount <= Decimal::ZERO {
        return Err(BizOpsError::validation_error(format!(
            "金额必须大于0，当前为 {amount}"
        )));
    }
    Ok(())
}

/// 新建周期账单请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewObligation {
    pub client_id: i64,
    pub name: String,
    pub amount: Decimal,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl NewObligation {
    pub fn validate(&self) -> BizOpsResult<()> {
        if self.name.trim().is_empty() {
            return Err(BizOpsError::validation_error("周期账单名称不能为空"));
        }
        validate_amount(self.amount)?;
        if let Some(end_date) = self.end_date {
            if end_date < self.next_due_date {
                return Err(BizOpsError::validation_error(format!(
                    "结束日期 {end_date} 早于首个到期日 {}",
                    self.next_due_date
                )));
            }
        }
        Ok(())
    }
}

/// 修改金额 / 频率 / 结束日期
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObligationTermsUpdate {
    pub amount: Option<Decimal>,
    pub frequency: Option<Frequency>,
    pub end_date: Option<NaiveDate>,
}

impl ObligationTermsUpdate {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.frequency.is_none() && self.end_date.is_none()
    }

    pub fn validate(&self, current: &RecurringPayment) -> BizOpsResult<()> {
        if self.is_empty() {
            return Err(BizOpsError::validation_error("没有需要更新的字段"));
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(end_date) = self.end_date {
            if end_date < current.next_due_date {
                return Err(BizOpsError::validation_error(format!(
                    "结束日期 {end_date} 早于下一个到期日 {}",
                    current.next_due_date
                )));
            }
        }
        Ok(())
    }
}

/// 单次付款记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub owner_id: i64,
    pub client_id: i64,
    pub project_id: Option<i64>,
    pub recurring_payment_id: Option<i64>,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub invoice_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// 由周期账单生成的付款，金额与客户都取自账单
    pub fn for_obligation(
        obligation: &RecurringPayment,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            owner_id: obligation.owner_id,
            client_id: obligation.client_id,
            project_id: None,
            recurring_payment_id: Some(obligation.id),
            amount: obligation.amount,
            status: PaymentStatus::Pending,
            due_date,
            paid_at: None,
            invoice_number: None,
            created_at: now,
        }
    }

    /// PENDING 且已过到期日即视为 OVERDUE
    pub fn effective_status(&self, today: NaiveDate) -> PaymentStatus {
        match self.status {
            PaymentStatus::Pending if self.due_date < today => PaymentStatus::Overdue,
            status => status,
        }
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> BizOpsResult<()> {
        if !self.status.is_collectible() {
            return Err(BizOpsError::invalid_transition(
                PAYMENT_ENTITY,
                self.id,
                self.status,
                "mark_paid",
            ));
        }
        self.status = PaymentStatus::Paid;
        self.paid_at = Some(now);
        Ok(())
    }

    pub fn cancel(&mut self) -> BizOpsResult<()> {
        if !self.status.is_collectible() {
            return Err(BizOpsError::invalid_transition(
                PAYMENT_ENTITY,
                self.id,
                self.status,
                "cancel",
            ));
        }
        self.status = PaymentStatus::Cancelled;
        Ok(())
    }

    pub fn entity_description(&self) -> String {
        match self.recurring_payment_id {
            Some(obligation_id) => format!(
                "付款 (ID: {}, 周期账单ID: {}, 到期日: {})",
                self.id, obligation_id, self.due_date
            ),
            None => format!("付款 (ID: {}, 到期日: {})", self.id, self.due_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap()
    }

    fn obligation(status: ObligationStatus) -> RecurringPayment {
        let new = NewObligation {
            client_id: 1,
            name: "月度维护".to_string(),
            amount: Decimal::new(300, 0),
            frequency: Frequency::Monthly,
            next_due_date: ymd(2024, 1, 31),
            end_date: None,
        };
        let mut obligation = RecurringPayment::from_new(1, &new, now());
        obligation.id = 10;
        obligation.status = status;
        obligation
    }

    #[test]
    fn test_plan_advance_is_calendar_correct() {
        let mut obligation = obligation(ObligationStatus::Active);
        let plan = obligation.plan_advance().unwrap();
        assert_eq!(plan.previous_due_date, ymd(2024, 1, 31));
        assert_eq!(plan.next_due_date, ymd(2024, 2, 29));

        obligation.apply_advance(plan, now());
        assert_eq!(obligation.last_paid_date, Some(ymd(2024, 1, 31)));
        assert_eq!(obligation.next_due_date, ymd(2024, 2, 29));
    }

    #[test]
    fn test_plan_advance_rejects_inactive() {
        for status in [ObligationStatus::Paused, ObligationStatus::Cancelled, ObligationStatus::Completed] {
            let err = obligation(status).plan_advance().unwrap_err();
            assert!(matches!(err, BizOpsError::ObligationNotActive { id: 10, .. }));
        }
    }

    #[test]
    fn test_plan_advance_respects_end_date() {
        let mut obligation = obligation(ObligationStatus::Active);
        obligation.end_date = Some(ymd(2024, 2, 15));
        let err = obligation.plan_advance().unwrap_err();
        assert!(matches!(err, BizOpsError::InvalidStateTransition { action: "advance", .. }));
    }

    #[test]
    fn test_transition_table() {
        use ObligationAction::*;
        use ObligationStatus::*;
        let allowed = [
            (Active, Pause, Paused),
            (Paused, Resume, Active),
            (Active, Cancel, Cancelled),
            (Paused, Cancel, Cancelled),
            (Active, Complete, Completed),
        ];
        for (from, action, to) in allowed {
            assert_eq!(obligation(from).transition_target(action).unwrap(), to);
        }

        let rejected = [
            (Paused, Pause),
            (Active, Resume),
            (Cancelled, Cancel),
            (Cancelled, Resume),
            (Completed, Cancel),
            (Paused, Complete),
        ];
        for (from, action) in rejected {
            assert!(obligation(from).transition_target(action).is_err());
        }
    }

    #[test]
    fn test_new_obligation_validation() {
        let mut new = NewObligation {
            client_id: 1,
            name: "托管".to_string(),
            amount: Decimal::ZERO,
            frequency: Frequency::Monthly,
            next_due_date: ymd(2024, 3, 1),
            end_date: None,
        };
        assert!(new.validate().is_err());
        new.amount = Decimal::new(-5, 0);
        assert!(new.validate().is_err());
        new.amount = Decimal::new(5, 0);
        assert!(new.validate().is_ok());
        new.end_date = Some(ymd(2024, 2, 1));
        assert!(new.validate().is_err());
        new.end_date = None;
        new.name = "   ".to_string();
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_payment_transitions() {
        let obligation = obligation(ObligationStatus::Active);
        let mut payment = Payment::for_obligation(&obligation, ymd(2024, 1, 31), now());
        assert_eq!(payment.amount, Decimal::new(300, 0));
        assert_eq!(payment.recurring_payment_id, Some(10));
        assert_eq!(payment.effective_status(ymd(2024, 1, 31)), PaymentStatus::Pending);
        assert_eq!(payment.effective_status(ymd(2024, 2, 1)), PaymentStatus::Overdue);

        payment.mark_paid(now()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.paid_at, Some(now()));
        assert_eq!(payment.effective_status(ymd(2024, 5, 1)), PaymentStatus::Paid);
        assert!(payment.mark_paid(now()).is_err());
        assert!(payment.cancel().is_err());
    }
}
