use std::sync::Arc;

use bizops_application::{PaymentService, RecurringService};
use bizops_domain::{ClientRepository, Payment, PaymentStatus};
use bizops_errors::BizOpsError;
use bizops_testing_utils::{
    date, fixed_clock, money, utc, ClientBuilder, MockStore, NewObligationBuilder,
    RecordingActivityRecorder, RecordingBillingGateway, TEST_OWNER,
};
use rust_decimal::Decimal;

struct Harness {
    store: MockStore,
    payments: PaymentService,
    first_payment: Payment,
    obligation_id: i64,
    client_id: i64,
}

/// 今天是 2024-02-10，首笔付款 2024-01-31 到期，已逾期
async fn harness() -> Harness {
    let store = MockStore::new();
    let client = store.create(&ClientBuilder::new().build()).await.unwrap();
    let clock = Arc::new(fixed_clock(2024, 2, 10));
    let activity = RecordingActivityRecorder::new();

    let recurring = RecurringService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(RecordingBillingGateway::new()),
        Arc::new(activity.clone()),
        clock.clone(),
    );
    let (obligation, first_payment) = recurring
        .create(TEST_OWNER, NewObligationBuilder::new(client.id).build())
        .await
        .unwrap();

    let payments = PaymentService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(activity),
        clock,
    );

    Harness {
        store,
        payments,
        first_payment,
        obligation_id: obligation.id,
        client_id: client.id,
    }
}

#[tokio::test]
async fn test_history_derives_overdue() {
    let h = harness().await;
    let history = h
        .payments
        .list_for_obligation(TEST_OWNER, h.obligation_id)
        .await
        .unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, PaymentStatus::Overdue);
    // 存储的状态仍是 PENDING
    assert_eq!(h.store.payments_for(h.obligation_id)[0].status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_mark_paid_applies_revenue_once() {
    let h = harness().await;

    let paid = h
        .payments
        .mark_paid(TEST_OWNER, h.first_payment.id)
        .await
        .unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert_eq!(paid.paid_at, Some(utc(2024, 2, 10, 9)));
    assert_eq!(h.store.client(h.client_id).unwrap().total_revenue, money("1000.00"));

    let again = h.payments.mark_paid(TEST_OWNER, h.first_payment.id).await;
    assert!(matches!(
        again,
        Err(BizOpsError::InvalidStateTransition { .. })
    ));
    assert_eq!(h.store.client(h.client_id).unwrap().total_revenue, money("1000.00"));
}

#[tokio::test]
async fn test_materialised_overdue_can_still_be_paid() {
    let h = harness().await;

    let updated = h.payments.refresh_overdue(TEST_OWNER).await.unwrap();
    assert_eq!(updated, 1);
    assert_eq!(
        h.store.payments_for(h.obligation_id)[0].status,
        PaymentStatus::Overdue
    );
    assert_eq!(h.payments.refresh_overdue(TEST_OWNER).await.unwrap(), 0);

    let paid = h
        .payments
        .mark_paid(TEST_OWNER, h.first_payment.id)
        .await
        .unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_cancelled_payment_cannot_be_paid() {
    let h = harness().await;

    let cancelled = h
        .payments
        .cancel(TEST_OWNER, h.first_payment.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, PaymentStatus::Cancelled);

    let result = h.payments.mark_paid(TEST_OWNER, h.first_payment.id).await;
    assert!(matches!(
        result,
        Err(BizOpsError::InvalidStateTransition { .. })
    ));
    assert_eq!(h.store.client(h.client_id).unwrap().total_revenue, Decimal::ZERO);
}

#[tokio::test]
async fn test_future_payment_is_pending() {
    let h = harness().await;
    let mut future = h.first_payment.clone();
    future.due_date = date(2024, 3, 31);
    h.store.insert_payment(future);

    let history = h
        .payments
        .list_for_obligation(TEST_OWNER, h.obligation_id)
        .await
        .unwrap();
    let statuses: Vec<_> = history.iter().map(|p| p.status).collect();
    assert_eq!(statuses, vec![PaymentStatus::Overdue, PaymentStatus::Pending]);
}

#[tokio::test]
async fn test_foreign_owner_sees_nothing() {
    let h = harness().await;

    let result = h.payments.mark_paid(99, h.first_payment.id).await;
    assert!(matches!(result, Err(BizOpsError::NotFound { .. })));

    let result = h.payments.list_for_obligation(99, h.obligation_id).await;
    assert!(matches!(result, Err(BizOpsError::NotFound { .. })));
}
