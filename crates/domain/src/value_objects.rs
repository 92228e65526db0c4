//! 值对象
//!
//! 各实体共享的枚举与分类规则。数据库中统一以大写字符串存储。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {s}", $label)),
                }
            }
        }
    };
}

/// 客户等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientTier {
    Regular,
    Vip,
}
string_enum!(ClientTier, "client tier", { Regular => "REGULAR", Vip => "VIP" });

/// 任务状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    WaitingApproval,
    Completed,
    Cancelled,
}
string_enum!(TaskStatus, "task status", {
    Todo => "TODO",
    InProgress => "IN_PROGRESS",
    WaitingApproval => "WAITING_APPROVAL",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

impl TaskStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

/// 项目阶段
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStage {
    Planning,
    Development,
    Testing,
    Review,
    Delivery,
    Maintenance,
}
string_enum!(ProjectStage, "project stage", {
    Planning => "PLANNING",
    Development => "DEVELOPMENT",
    Testing => "TESTING",
    Review => "REVIEW",
    Delivery => "DELIVERY",
    Maintenance => "MAINTENANCE",
});

/// 项目整体状态，与阶段相互独立
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Active,
    OnHold,
    Completed,
    Cancelled,
}
string_enum!(ProjectStatus, "project status", {
    Active => "ACTIVE",
    OnHold => "ON_HOLD",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

impl ProjectStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, ProjectStatus::Completed | ProjectStatus::Cancelled)
    }
}

/// 计费频率
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}
string_enum!(Frequency, "frequency", {
    Daily => "DAILY",
    Weekly => "WEEKLY",
    Monthly => "MONTHLY",
    Quarterly => "QUARTERLY",
    Yearly => "YEARLY",
});

/// 周期账单生命周期
///
/// ```text
/// ACTIVE ──pause──▶ PAUSED ──resume──▶ ACTIVE
///   │                 │
///   ├──cancel──▶ CANCELLED ◀──cancel──┘
///   └──complete──▶ COMPLETED
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationStatus {
    Active,
    Paused,
    Cancelled,
    Completed,
}
string_enum!(ObligationStatus, "obligation status", {
    Active => "ACTIVE",
    Paused => "PAUSED",
    Cancelled => "CANCELLED",
    Completed => "COMPLETED",
});

impl ObligationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ObligationStatus::Cancelled | ObligationStatus::Completed)
    }
}

/// 付款状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}
string_enum!(PaymentStatus, "payment status", {
    Pending => "PENDING",
    Paid => "PAID",
    Overdue => "OVERDUE",
    Cancelled => "CANCELLED",
});

impl PaymentStatus {
    /// 仍可收款的状态
    pub fn is_collectible(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Overdue)
    }
}

/// 紧急程度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl UrgencyLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 70 => UrgencyLevel::Critical,
            s if s >= 40 => UrgencyLevel::High,
            s if s >= 20 => UrgencyLevel::Medium,
            _ => UrgencyLevel::Low,
        }
    }
}

/// 可评分条目的类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Task,
    Project,
}

/// 可评分条目的引用
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: i64,
}

impl ItemRef {
    pub fn task(id: i64) -> Self {
        Self {
            kind: ItemKind::Task,
            id,
        }
    }
    pub fn project(id: i64) -> Self {
        Self {
            kind: ItemKind::Project,
            id,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ItemKind::Task => write!(f, "task#{}", self.id),
            ItemKind::Project => write!(f, "project#{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_thresholds() {
        assert_eq!(UrgencyLevel::from_score(100), UrgencyLevel::Critical);
        assert_eq!(UrgencyLevel::from_score(70), UrgencyLevel::Critical);
        assert_eq!(UrgencyLevel::from_score(69), UrgencyLevel::High);
        assert_eq!(UrgencyLevel::from_score(40), UrgencyLevel::High);
        assert_eq!(UrgencyLevel::from_score(39), UrgencyLevel::Medium);
        assert_eq!(UrgencyLevel::from_score(20), UrgencyLevel::Medium);
        assert_eq!(UrgencyLevel::from_score(19), UrgencyLevel::Low);
        assert_eq!(UrgencyLevel::from_score(0), UrgencyLevel::Low);
    }

    #[test]
    fn test_string_round_trip_and_rejection() {
        assert_eq!("waiting_approval".parse::<TaskStatus>(), Ok(TaskStatus::WaitingApproval));
        assert_eq!(ObligationStatus::Paused.to_string(), "PAUSED");
        assert!("FORTNIGHTLY".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_open_states() {
        assert!(TaskStatus::Todo.is_open());
        assert!(!TaskStatus::Cancelled.is_open());
        assert!(ProjectStatus::OnHold.is_open());
        assert!(!ProjectStatus::Completed.is_open());
        assert!(ObligationStatus::Completed.is_terminal());
        assert!(!ObligationStatus::Paused.is_terminal());
        assert!(PaymentStatus::Overdue.is_collectible());
        assert!(!PaymentStatus::Paid.is_collectible());
    }

    #[test]
    fn test_serde_representation() {
        let json = serde_json::to_string(&UrgencyLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let json = serde_json::to_string(&TaskStatus::WaitingApproval).unwrap();
        assert_eq!(json, "\"WAITING_APPROVAL\"");
    }
}
