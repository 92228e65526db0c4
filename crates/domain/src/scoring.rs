//! # 优先级评分
//!
//! 对单个任务或项目计算 0–100 的优先级分数，由四个固定权重的分量组成：
//!
//! | 分量 | 区间 | 依据 |
//! |------|------|------|
//! | 截止时间 | 0–40 | 距截止日的天数分段 |
//! | 金额 | 0–30 | 金额 / 50000 × 30，封顶 30 |
//! | 客户 | 0–20 | VIP 20，普通客户 10，无客户 0 |
//! | 状态 | 0–10 | 任务状态或项目阶段 |
//!
//! 权重是业务常量，不可配置。评分是纯函数，缺失的可选字段贡献 0 分。

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::days_until;
use crate::entities::{Lifecycle, WorkableItem};
use crate::value_objects::{ClientTier, ProjectStage, TaskStatus, UrgencyLevel};

pub const DEADLINE_WEIGHT: u8 = 40;
pub const VALUE_WEIGHT: f64 = 30.0;
pub const VALUE_CEILING: i64 = 50_000;

/// 分数说明中的理由，按固定顺序输出
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriorityReason {
    UrgentDeadline,
    HighBudget,
    VipClient,
    AwaitingApproval,
    AdvancedStage,
    Normal,
}

impl PriorityReason {
    pub fn text(&self) -> &'static str {
        match self {
            PriorityReason::UrgentDeadline => "urgent deadline",
            PriorityReason::HighBudget => "high budget",
            PriorityReason::VipClient => "VIP client",
            PriorityReason::AwaitingApproval => "waiting on approval",
            PriorityReason::AdvancedStage => "advanced stage",
            PriorityReason::Normal => "normal priority",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub deadline_score: u8,
    pub value_score: f64,
    pub client_score: u8,
    pub status_score: u8,
    pub total_score: u8,
    pub reasons: Vec<PriorityReason>,
}

impl ScoreBreakdown {
    pub fn reason(&self) -> String {
        self.reasons
            .iter()
            .map(PriorityReason::text)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn urgency_level(&self) -> UrgencyLevel {
        UrgencyLevel::from_score(self.total_score)
    }
}

/// 截止时间分量，分段边界包含较小的天数
pub fn deadline_score(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u8 {
    let Some(deadline) = deadline else {
        return 0;
    };
    match days_until(deadline, now) {
        d if d < 0 => DEADLINE_WEIGHT,
        0..=1 => 35,
        2..=3 => 30,
        4..=7 => 20,
        8..=14 => 10,
        _ => 5,
    }
}

pub fn value_score(monetary_value: Option<Decimal>) -> f64 {
    let Some(value) = monetary_value else {
        return 0.0;
    };
    let ratio = (value / Decimal::from(VALUE_CEILING)).to_f64().unwrap_or(0.0);
    (ratio * VALUE_WEIGHT).clamp(0.0, VALUE_WEIGHT)
}

pub fn client_score(tier: Option<ClientTier>) -> u8 {
    match tier {
        Some(ClientTier::Vip) => 20,
        Some(ClientTier::Regular) => 10,
        None => 0,
    }
}

pub fn status_score(lifecycle: Lifecycle) -> u8 {
    match lifecycle {
        Lifecycle::Task(status) => match status {
            TaskStatus::WaitingApproval => 10,
            TaskStatus::InProgress => 8,
            TaskStatus::Todo => 5,
            TaskStatus::Completed | TaskStatus::Cancelled => 0,
        },
        Lifecycle::Project(stage) => match stage {
            ProjectStage::Review | ProjectStage::Delivery => 10,
            ProjectStage::Testing => 8,
            ProjectStage::Development => 6,
            ProjectStage::Planning => 4,
            ProjectStage::Maintenance => 2,
        },
    }
}

fn collect_reasons(
    deadline: u8,
    value: f64,
    client: u8,
    status: u8,
    lifecycle: Lifecycle,
) -> Vec<PriorityReason> {
    let mut reasons = Vec::new();
    if deadline >= 30 {
        reasons.push(PriorityReason::UrgentDeadline);
    }
    if value >= 20.0 {
        reasons.push(PriorityReason::HighBudget);
    }
    if client >= 20 {
        reasons.push(PriorityReason::VipClient);
    }
    if status >= 8 {
        reasons.push(match lifecycle {
            Lifecycle::Task(_) => PriorityReason::AwaitingApproval,
            Lifecycle::Project(_) => PriorityReason::AdvancedStage,
        });
    }
    if reasons.is_empty() {
        reasons.push(PriorityReason::Normal);
    }
    reasons
}

/// 计算单个条目的评分明细
pub fn compute_score(item: &WorkableItem, now: DateTime<Utc>) -> ScoreBreakdown {
    let deadline = deadline_score(item.deadline, now);
    let value = value_score(item.monetary_value);
    let client = client_score(item.client_tier);
    let status = status_score(item.lifecycle);

    let sum = f64::from(deadline) + value + f64::from(client) + f64::from(status);
    let total_score = sum.round().clamp(0.0, 100.0) as u8;

    ScoreBreakdown {
        deadline_score: deadline,
        value_score: value,
        client_score: client,
        status_score: status,
        total_score,
        reasons: collect_reasons(deadline, value, client, status, item.lifecycle),
    }
}
