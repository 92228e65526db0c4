use bizops_domain::{
    ClientRepository, ClientTier, ItemRef, Lifecycle, ObligationStatus, PaymentRepository,
    PaymentStatus, ProjectStage, RecurringPayment, RecurringPaymentRepository, TaskStatus,
    WorkItemRepository,
};
use bizops_errors::BizOpsError;
use bizops_infrastructure::DatabaseManager;
use bizops_testing_utils::{
    date, money, utc, ClientBuilder, NewObligationBuilder, ProjectBuilder, TaskBuilder,
    TEST_OWNER,
};
use rust_decimal::Decimal;

async fn setup() -> DatabaseManager {
    DatabaseManager::in_memory()
        .await
        .expect("内存数据库初始化失败")
}

async fn new_obligation(db: &DatabaseManager, client_id: i64) -> RecurringPayment {
    let request = NewObligationBuilder::new(client_id).build();
    let obligation = RecurringPayment::from_new(TEST_OWNER, &request, utc(2024, 1, 15, 9));
    db.recurring_payment_repository()
        .create_with_first_payment(&obligation)
        .await
        .unwrap()
        .0
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let db = setup().await;
    db.migrate().await.unwrap();
    db.health_check().await.unwrap();
}

#[tokio::test]
async fn test_client_round_trip_and_tenant_scoping() {
    let db = setup().await;
    let clients = db.client_repository();

    let created = clients
        .create(&ClientBuilder::new().with_name("Acme").vip().build())
        .await
        .unwrap();
    assert!(created.id > 0);

    let found = clients.find_by_id(TEST_OWNER, created.id).await.unwrap().unwrap();
    assert_eq!(found.name, "Acme");
    assert_eq!(found.tier, ClientTier::Vip);
    assert_eq!(found.total_revenue, Decimal::ZERO);
    assert_eq!(found.created_at, created.created_at);

    assert!(clients.find_by_id(99, created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_task_snapshot_falls_back_to_project_client() {
    let db = setup().await;
    let clients = db.client_repository();
    let work_items = db.work_item_repository();

    let vip = clients.create(&ClientBuilder::new().vip().build()).await.unwrap();
    let regular = clients.create(&ClientBuilder::new().build()).await.unwrap();
    let project = work_items
        .create_project(
            &ProjectBuilder::new()
                .for_client(vip.id)
                .with_budget("12000.50")
                .with_stage(ProjectStage::Testing)
                .build(),
        )
        .await
        .unwrap();

    let inherited = work_items
        .create_task(&TaskBuilder::new().in_project(project.id).build())
        .await
        .unwrap();
    let own_client = work_items
        .create_task(
            &TaskBuilder::new()
                .in_project(project.id)
                .for_client(regular.id)
                .with_status(TaskStatus::WaitingApproval)
                .build(),
        )
        .await
        .unwrap();

    let snapshot = work_items
        .load_snapshot(TEST_OWNER, ItemRef::task(inherited.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.client_tier, Some(ClientTier::Vip));
    assert_eq!(snapshot.monetary_value, Some(money("12000.50")));
    assert_eq!(snapshot.lifecycle, Lifecycle::Task(TaskStatus::Todo));

    let snapshot = work_items
        .load_snapshot(TEST_OWNER, ItemRef::task(own_client.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.client_tier, Some(ClientTier::Regular));
    assert_eq!(snapshot.lifecycle, Lifecycle::Task(TaskStatus::WaitingApproval));

    let snapshot = work_items
        .load_snapshot(TEST_OWNER, ItemRef::project(project.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.client_tier, Some(ClientTier::Vip));
    assert_eq!(snapshot.lifecycle, Lifecycle::Project(ProjectStage::Testing));

    let foreign = work_items
        .load_snapshot(99, ItemRef::task(inherited.id))
        .await
        .unwrap();
    assert!(foreign.is_none());
}

#[tokio::test]
async fn test_top_open_tasks_order_and_persisted_scores() {
    let db = setup().await;
    let work_items = db.work_item_repository();

    let later = work_items
        .create_task(&TaskBuilder::new().created_at(utc(2024, 2, 1, 0)).build())
        .await
        .unwrap();
    let earlier = work_items
        .create_task(&TaskBuilder::new().created_at(utc(2024, 1, 1, 0)).build())
        .await
        .unwrap();
    let low = work_items.create_task(&TaskBuilder::new().build()).await.unwrap();
    work_items
        .create_task(
            &TaskBuilder::new()
                .with_status(TaskStatus::Completed)
                .with_score(100)
                .build(),
        )
        .await
        .unwrap();

    let calculated_at = utc(2024, 3, 1, 12);
    for id in [later.id, earlier.id] {
        work_items
            .persist_score(TEST_OWNER, ItemRef::task(id), 70, calculated_at)
            .await
            .unwrap();
    }
    work_items
        .persist_score(TEST_OWNER, ItemRef::task(low.id), 20, calculated_at)
        .await
        .unwrap();

    // 其他租户不能改写分数
    let foreign = work_items
        .persist_score(99, ItemRef::task(low.id), 95, calculated_at)
        .await;
    assert!(matches!(foreign, Err(BizOpsError::NotFound { .. })));

    let top = work_items.top_open_tasks(TEST_OWNER, 10).await.unwrap();
    let refs: Vec<ItemRef> = top.iter().map(|c| c.item).collect();
    assert_eq!(
        refs,
        vec![
            ItemRef::task(earlier.id),
            ItemRef::task(later.id),
            ItemRef::task(low.id),
        ]
    );

    let limited = work_items.top_open_tasks(TEST_OWNER, 1).await.unwrap();
    assert_eq!(limited.len(), 1);

    let stored = work_items.find_task(TEST_OWNER, low.id).await.unwrap().unwrap();
    assert_eq!(stored.priority_score, 20);
    assert_eq!(stored.priority_calculated_at, Some(calculated_at));

    let open = work_items.list_open_items(TEST_OWNER).await.unwrap();
    assert_eq!(open.len(), 3);
}

#[tokio::test]
async fn test_create_with_first_payment_is_atomic() {
    let db = setup().await;
    let client = db
        .client_repository()
        .create(&ClientBuilder::new().build())
        .await
        .unwrap();
    let obligations = db.recurring_payment_repository();
    let payments = db.payment_repository();

    let obligation = new_obligation(&db, client.id).await;
    let history = payments
        .list_by_obligation(TEST_OWNER, obligation.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].due_date, date(2024, 1, 31));
    assert_eq!(history[0].amount, money("1000.00"));
    assert_eq!(history[0].status, PaymentStatus::Pending);

    // 客户不存在时外键失败，账单与付款都不会写入
    let orphan = RecurringPayment::from_new(
        TEST_OWNER,
        &NewObligationBuilder::new(9999).build(),
        utc(2024, 1, 15, 9),
    );
    let result = obligations.create_with_first_payment(&orphan).await;
    assert!(matches!(result, Err(BizOpsError::DatabaseOperation(_))));
    assert_eq!(obligations.list(TEST_OWNER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_apply_advance_rejects_stale_plan() {
    let db = setup().await;
    let client = db
        .client_repository()
        .create(&ClientBuilder::new().build())
        .await
        .unwrap();
    let obligations = db.recurring_payment_repository();

    let mut obligation = new_obligation(&db, client.id).await;
    let plan = obligation.plan_advance().unwrap();
    obligation.apply_advance(plan, utc(2024, 1, 31, 9));
    let payment =
        bizops_domain::Payment::for_obligation(&obligation, plan.next_due_date, utc(2024, 1, 31, 9));

    let (_, created) = obligations
        .apply_advance(&obligation, plan, &payment)
        .await
        .unwrap();
    assert_eq!(created.due_date, date(2024, 2, 29));

    let stored = obligations
        .find_by_id(TEST_OWNER, obligation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.next_due_date, date(2024, 2, 29));
    assert_eq!(stored.last_paid_date, Some(date(2024, 1, 31)));

    // 同一计划再次提交：到期日已被推进，条件更新不命中
    let again = obligations.apply_advance(&obligation, plan, &payment).await;
    assert!(matches!(
        again,
        Err(BizOpsError::InvalidStateTransition { .. })
    ));
    assert_eq!(
        db.payment_repository()
            .count_by_obligation(obligation.id)
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_mark_paid_updates_revenue_in_same_transaction() {
    let db = setup().await;
    let clients = db.client_repository();
    let client = clients.create(&ClientBuilder::new().build()).await.unwrap();
    let payments = db.payment_repository();

    let obligation = new_obligation(&db, client.id).await;
    let mut payment = payments
        .list_by_obligation(TEST_OWNER, obligation.id)
        .await
        .unwrap()
        .remove(0);
    payment.mark_paid(utc(2024, 2, 1, 10)).unwrap();

    let paid = payments.mark_paid(&payment).await.unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);

    let stored = payments.find_by_id(TEST_OWNER, payment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Paid);
    assert_eq!(stored.paid_at, Some(utc(2024, 2, 1, 10)));
    let revenue = clients
        .find_by_id(TEST_OWNER, client.id)
        .await
        .unwrap()
        .unwrap()
        .total_revenue;
    assert_eq!(revenue, money("1000.00"));

    let again = payments.mark_paid(&payment).await;
    assert!(matches!(
        again,
        Err(BizOpsError::InvalidStateTransition { .. })
    ));
    let revenue = clients
        .find_by_id(TEST_OWNER, client.id)
        .await
        .unwrap()
        .unwrap()
        .total_revenue;
    assert_eq!(revenue, money("1000.00"));
}

#[tokio::test]
async fn test_mark_overdue_and_cancel() {
    let db = setup().await;
    let client = db
        .client_repository()
        .create(&ClientBuilder::new().build())
        .await
        .unwrap();
    let payments = db.payment_repository();
    let obligation = new_obligation(&db, client.id).await;

    assert_eq!(payments.mark_overdue(TEST_OWNER, date(2024, 1, 31)).await.unwrap(), 0);
    assert_eq!(payments.mark_overdue(TEST_OWNER, date(2024, 2, 1)).await.unwrap(), 1);
    assert_eq!(payments.mark_overdue(99, date(2024, 3, 1)).await.unwrap(), 0);

    let mut payment = payments
        .list_by_obligation(TEST_OWNER, obligation.id)
        .await
        .unwrap()
        .remove(0);
    assert_eq!(payment.status, PaymentStatus::Overdue);

    payment.cancel().unwrap();
    let cancelled = payments.update_status(&payment).await.unwrap();
    assert_eq!(cancelled.status, PaymentStatus::Cancelled);

    let again = payments.update_status(&payment).await;
    assert!(matches!(
        again,
        Err(BizOpsError::InvalidStateTransition { .. })
    ));
}

#[tokio::test]
async fn test_update_and_delete_obligation() {
    let db = setup().await;
    let client = db
        .client_repository()
        .create(&ClientBuilder::new().build())
        .await
        .unwrap();
    let obligations = db.recurring_payment_repository();
    let mut obligation = new_obligation(&db, client.id).await;

    obligation.amount = money("1250.00");
    obligation.status = ObligationStatus::Paused;
    obligations
        .update(&obligation, ObligationStatus::Active)
        .await
        .unwrap();
    let stored = obligations
        .find_by_id(TEST_OWNER, obligation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.amount, money("1250.00"));
    assert_eq!(stored.status, ObligationStatus::Paused);

    assert!(!obligations.delete(99, obligation.id).await.unwrap());

    sqlx::query("DELETE FROM payments WHERE recurring_payment_id = ?")
        .bind(obligation.id)
        .execute(db.pool())
        .await
        .unwrap();
    assert!(obligations.delete(TEST_OWNER, obligation.id).await.unwrap());
    assert!(obligations
        .find_by_id(TEST_OWNER, obligation.id)
        .await
        .unwrap()
        .is_none());

    let missing = obligations
        .update(&obligation, ObligationStatus::Paused)
        .await;
    assert!(matches!(missing, Err(BizOpsError::NotFound { .. })));
}

#[tokio::test]
async fn test_update_rejects_snapshot_taken_before_advance() {
    let db = setup().await;
    let client = db
        .client_repository()
        .create(&ClientBuilder::new().build())
        .await
        .unwrap();
    let obligations = db.recurring_payment_repository();

    let snapshot = new_obligation(&db, client.id).await;

    let mut advanced = snapshot.clone();
    let plan = advanced.plan_advance().unwrap();
    advanced.apply_advance(plan, utc(2024, 1, 31, 9));
    let payment =
        bizops_domain::Payment::for_obligation(&advanced, plan.next_due_date, utc(2024, 1, 31, 9));
    obligations
        .apply_advance(&advanced, plan, &payment)
        .await
        .unwrap();

    // 推进前读取的快照不能覆盖 next_due_date / last_paid_date
    let mut stale = snapshot.clone();
    stale.status = ObligationStatus::Paused;
    let result = obligations.update(&stale, ObligationStatus::Active).await;
    assert!(matches!(
        result,
        Err(BizOpsError::InvalidStateTransition { action: "update", .. })
    ));

    let stored = obligations
        .find_by_id(TEST_OWNER, snapshot.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ObligationStatus::Active);
    assert_eq!(stored.next_due_date, date(2024, 2, 29));
    assert_eq!(stored.last_paid_date, Some(date(2024, 1, 31)));

    // 期望状态不符同样拒绝
    let mut fresh = stored.clone();
    fresh.status = ObligationStatus::Cancelled;
    let result = obligations.update(&fresh, ObligationStatus::Paused).await;
    assert!(matches!(result, Err(BizOpsError::InvalidStateTransition { .. })));
}
