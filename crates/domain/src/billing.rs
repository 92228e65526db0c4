//! 外部开票服务端口
//!
//! 开票服务按自己的时钟根据"retainer"定义生成单据，本地 `next_due_date`
//! 只用于本地报表，两套时间表相互独立，不假设在同一天出票。
//! 只有适配器实现会发起网络请求。

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{ObligationTermsUpdate, RecurringPayment};
use crate::value_objects::{Frequency, ObligationStatus};
use bizops_errors::BizOpsResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetainerSpec {
    pub client_id: i64,
    pub name: String,
    pub amount: Decimal,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl From<&RecurringPayment> for RetainerSpec {
    fn from(obligation: &RecurringPayment) -> Self {
        Self {
            client_id: obligation.client_id,
            name: obligation.name.clone(),
            amount: obligation.amount,
            frequency: obligation.frequency,
            start_date: obligation.next_due_date,
            end_date: obligation.end_date,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetainerUpdate {
    pub amount: Option<Decimal>,
    pub frequency: Option<Frequency>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ObligationStatus>,
}

impl RetainerUpdate {
    pub fn status(status: ObligationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// 把 `terms` 改动过的字段恢复为 `before` 中的值，用于本地提交失败后回滚远端。
    /// 原结束日期为空时无法用该结构表达清除，结束日期保持远端现值。
    pub fn revert_terms(before: &RecurringPayment, terms: &ObligationTermsUpdate) -> Self {
        Self {
            amount: terms.amount.map(|_| before.amount),
            frequency: terms.frequency.map(|_| before.frequency),
            end_date: terms.end_date.and(before.end_date),
            status: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.frequency.is_none()
            && self.end_date.is_none()
            && self.status.is_none()
    }
}

impl From<&ObligationTermsUpdate> for RetainerUpdate {
    fn from(terms: &ObligationTermsUpdate) -> Self {
        Self {
            amount: terms.amount,
            frequency: terms.frequency,
            end_date: terms.end_date,
            status: None,
        }
    }
}

/// 开票服务为某个 retainer 生成的单据（只读）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetainerDocument {
    pub id: String,
    pub number: Option<String>,
    pub issued_on: NaiveDate,
    pub amount: Decimal,
    pub url: Option<String>,
}

#[async_trait]
pub trait BillingGateway: Send + Sync {
    fn name(&self) -> &'static str;
    /// 远端是否能表达该频率
    fn supports_frequency(&self, frequency: Frequency) -> bool;
    /// 返回远端分配的 retainer ID；未启用同步时返回 None
    async fn create_retainer(&self, spec: &RetainerSpec) -> BizOpsResult<Option<String>>;
    async fn update_retainer(&self, retainer_id: &str, update: &RetainerUpdate) -> BizOpsResult<()>;
    async fn retainer_documents(&self, retainer_id: &str) -> BizOpsResult<Vec<RetainerDocument>>;
}
