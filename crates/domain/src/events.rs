//! 领域事件
//!
//! 活动记录是尽力而为的副作用，记录失败不影响主流程

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::ObligationStatus;
use bizops_errors::BizOpsResult;

/// 领域事件基础trait
pub trait DomainEvent: Send + Sync {
    fn event_id(&self) -> Uuid;
    fn event_type(&self) -> &str;
    fn occurred_at(&self) -> DateTime<Utc>;
    fn aggregate_id(&self) -> String;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObligationEvent {
    ObligationCreated {
        id: Uuid,
        obligation_id: i64,
        first_payment_id: i64,
        occurred_at: DateTime<Utc>,
    },
    ObligationAdvanced {
        id: Uuid,
        obligation_id: i64,
        payment_id: i64,
        next_due_date: NaiveDate,
        occurred_at: DateTime<Utc>,
    },
    ObligationStatusChanged {
        id: Uuid,
        obligation_id: i64,
        from: ObligationStatus,
        to: ObligationStatus,
        occurred_at: DateTime<Utc>,
    },
    ObligationTermsUpdated {
        id: Uuid,
        obligation_id: i64,
        occurred_at: DateTime<Utc>,
    },
    PaymentPaid {
        id: Uuid,
        payment_id: i64,
        client_id: i64,
        amount: Decimal,
        occurred_at: DateTime<Utc>,
    },
}

impl ObligationEvent {
    pub fn created(obligation_id: i64, first_payment_id: i64, at: DateTime<Utc>) -> Self {
        Self::ObligationCreated {
            id: Uuid::new_v4(),
            obligation_id,
            first_payment_id,
            occurred_at: at,
        }
    }
    pub fn advanced(
        obligation_id: i64,
        payment_id: i64,
        next_due_date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Self {
        Self::ObligationAdvanced {
            id: Uuid::new_v4(),
            obligation_id,
            payment_id,
            next_due_date,
            occurred_at: at,
        }
    }
    pub fn status_changed(
        obligation_id: i64,
        from: ObligationStatus,
        to: ObligationStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self::ObligationStatusChanged {
            id: Uuid::new_v4(),
            obligation_id,
            from,
            to,
            occurred_at: at,
        }
    }
    pub fn terms_updated(obligation_id: i64, at: DateTime<Utc>) -> Self {
        Self::ObligationTermsUpdated {
            id: Uuid::new_v4(),
            obligation_id,
            occurred_at: at,
        }
    }
    pub fn payment_paid(payment_id: i64, client_id: i64, amount: Decimal, at: DateTime<Utc>) -> Self {
        Self::PaymentPaid {
            id: Uuid::new_v4(),
            payment_id,
            client_id,
            amount,
            occurred_at: at,
        }
    }
}

impl DomainEvent for ObligationEvent {
    fn event_id(&self) -> Uuid {
        match self {
            ObligationEvent::ObligationCreated { id, .. }
            | ObligationEvent::ObligationAdvanced { id, .. }
            | ObligationEvent::ObligationStatusChanged { id, .. }
            | ObligationEvent::ObligationTermsUpdated { id, .. }
            | ObligationEvent::PaymentPaid { id, .. } => *id,
        }
    }

    fn event_type(&self) -> &str {
        match self {
            ObligationEvent::ObligationCreated { .. } => "ObligationCreated",
            ObligationEvent::ObligationAdvanced { .. } => "ObligationAdvanced",
            ObligationEvent::ObligationStatusChanged { .. } => "ObligationStatusChanged",
            ObligationEvent::ObligationTermsUpdated { .. } => "ObligationTermsUpdated",
            ObligationEvent::PaymentPaid { .. } => "PaymentPaid",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ObligationEvent::ObligationCreated { occurred_at, .. }
            | ObligationEvent::ObligationAdvanced { occurred_at, .. }
            | ObligationEvent::ObligationStatusChanged { occurred_at, .. }
            | ObligationEvent::ObligationTermsUpdated { occurred_at, .. }
            | ObligationEvent::PaymentPaid { occurred_at, .. } => *occurred_at,
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            ObligationEvent::ObligationCreated { obligation_id, .. }
            | ObligationEvent::ObligationAdvanced { obligation_id, .. }
            | ObligationEvent::ObligationStatusChanged { obligation_id, .. }
            | ObligationEvent::ObligationTermsUpdated { obligation_id, .. } => {
                format!("obligation-{obligation_id}")
            }
            ObligationEvent::PaymentPaid { payment_id, .. } => format!("payment-{payment_id}"),
        }
    }
}

/// 活动记录器
#[async_trait]
pub trait ActivityRecorder: Send + Sync {
    async fn record(&self, event: &ObligationEvent) -> BizOpsResult<()>;
}
