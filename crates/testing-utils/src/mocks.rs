//! 内存版仓储与外部服务替身
//!
//! `MockStore` 把所有表放在同一把锁下，事务语义通过"先校验后写入"保证：
//! 任何一步失败都不会留下部分数据。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bizops_domain::{
    ActivityRecorder, AdvancePlan, BillingGateway, Client, ClientRepository, Frequency, ItemKind,
    ItemRef, Lifecycle, ObligationEvent, ObligationStatus, Payment, PaymentRepository,
    PaymentStatus, PriorityCandidate, Project, RecurringPayment, RecurringPaymentRepository,
    RetainerDocument, RetainerSpec, RetainerUpdate, Task, WorkItemRepository, WorkableItem,
    OBLIGATION_ENTITY, PAYMENT_ENTITY, PROJECT_ENTITY, TASK_ENTITY,
};
use bizops_errors::{BizOpsError, BizOpsResult};

#[derive(Debug, Default)]
struct StoreState {
    clients: HashMap<i64, Client>,
    tasks: HashMap<i64, Task>,
    projects: HashMap<i64, Project>,
    obligations: HashMap<i64, RecurringPayment>,
    payments: HashMap<i64, Payment>,
    next_id: i64,
}

impl StoreState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// 内存版数据存储，实现全部仓储 trait
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<StoreState>>,
    fail_obligation_writes: Arc<AtomicBool>,
    fail_score_writes: Arc<Mutex<HashSet<ItemRef>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的账单写入（创建 / 推进）都返回数据库错误
    pub fn fail_obligation_writes(&self, fail: bool) {
        self.fail_obligation_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_score_write_for(&self, item: ItemRef) {
        self.fail_score_writes.lock().unwrap().insert(item);
    }

    pub fn client(&self, id: i64) -> Option<Client> {
        self.state.lock().unwrap().clients.get(&id).cloned()
    }

    pub fn task(&self, id: i64) -> Option<Task> {
        self.state.lock().unwrap().tasks.get(&id).cloned()
    }

    pub fn project(&self, id: i64) -> Option<Project> {
        self.state.lock().unwrap().projects.get(&id).cloned()
    }

    pub fn obligation(&self, id: i64) -> Option<RecurringPayment> {
        self.state.lock().unwrap().obligations.get(&id).cloned()
    }

    pub fn obligation_count(&self) -> usize {
        self.state.lock().unwrap().obligations.len()
    }

    pub fn payments_for(&self, obligation_id: i64) -> Vec<Payment> {
        let state = self.state.lock().unwrap();
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.recurring_payment_id == Some(obligation_id))
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.due_date, p.id));
        payments
    }

    /// 直接插入付款（如与账单无关的项目收款）
    pub fn insert_payment(&self, payment: Payment) -> Payment {
        let mut state = self.state.lock().unwrap();
        let mut payment = payment;
        payment.id = state.allocate_id();
        state.payments.insert(payment.id, payment.clone());
        payment
    }

    fn check_obligation_writes(&self) -> BizOpsResult<()> {
        if self.fail_obligation_writes.load(Ordering::SeqCst) {
            return Err(BizOpsError::database_error("模拟的数据库写入失败"));
        }
        Ok(())
    }
}

fn candidate_order(a: &PriorityCandidate, b: &PriorityCandidate) -> std::cmp::Ordering {
    b.priority_score
        .cmp(&a.priority_score)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.item.id.cmp(&b.item.id))
}

#[async_trait]
impl ClientRepository for MockStore {
    async fn create(&self, client: &Client) -> BizOpsResult<Client> {
        let mut state = self.state.lock().unwrap();
        let mut client = client.clone();
        client.id = state.allocate_id();
        state.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn find_by_id(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Client>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .clients
            .get(&id)
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }
}

#[async_trait]
impl WorkItemRepository for MockStore {
    async fn create_task(&self, task: &Task) -> BizOpsResult<Task> {
        let mut state = self.state.lock().unwrap();
        let mut task = task.clone();
        task.id = state.allocate_id();
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn create_project(&self, project: &Project) -> BizOpsResult<Project> {
        let mut state = self.state.lock().unwrap();
        let mut project = project.clone();
        project.id = state.allocate_id();
        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find_task(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Task>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tasks
            .get(&id)
            .filter(|t| t.owner_id == owner_id)
            .cloned())
    }

    async fn find_project(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Project>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .projects
            .get(&id)
            .filter(|p| p.owner_id == owner_id)
            .cloned())
    }

    async fn load_snapshot(
        &self,
        owner_id: i64,
        item: ItemRef,
    ) -> BizOpsResult<Option<WorkableItem>> {
        let state = self.state.lock().unwrap();
        let tier_of = |client_id: Option<i64>| {
            client_id
                .and_then(|id| state.clients.get(&id))
                .map(|c| c.tier)
        };

        let snapshot = match item.kind {
            ItemKind::Task => state
                .tasks
                .get(&item.id)
                .filter(|t| t.owner_id == owner_id)
                .map(|task| {
                    let project = task.project_id.and_then(|id| state.projects.get(&id));
                    WorkableItem {
                        item,
                        title: task.title.clone(),
                        deadline: task.deadline,
                        monetary_value: project.and_then(|p| p.budget),
                        client_tier: tier_of(task.client_id)
                            .or_else(|| tier_of(project.and_then(|p| p.client_id))),
                        lifecycle: Lifecycle::Task(task.status),
                    }
                }),
            ItemKind::Project => state
                .projects
                .get(&item.id)
                .filter(|p| p.owner_id == owner_id)
                .map(|project| WorkableItem {
                    item,
                    title: project.name.clone(),
                    deadline: project.deadline,
                    monetary_value: project.budget,
                    client_tier: tier_of(project.client_id),
                    lifecycle: Lifecycle::Project(project.stage),
                }),
        };
        Ok(snapshot)
    }

    async fn persist_score(
        &self,
        owner_id: i64,
        item: ItemRef,
        score: u8,
        calculated_at: DateTime<Utc>,
    ) -> BizOpsResult<()> {
        if self.fail_score_writes.lock().unwrap().contains(&item) {
            return Err(BizOpsError::database_error(format!("模拟的分数写入失败: {item}")));
        }
        let mut state = self.state.lock().unwrap();
        match item.kind {
            ItemKind::Task => {
                let task = state
                    .tasks
                    .get_mut(&item.id)
                    .filter(|t| t.owner_id == owner_id)
                    .ok_or_else(|| BizOpsError::not_found(TASK_ENTITY, item.id))?;
                task.priority_score = score;
                task.priority_calculated_at = Some(calculated_at);
            }
            ItemKind::Project => {
                let project = state
                    .projects
                    .get_mut(&item.id)
                    .filter(|p| p.owner_id == owner_id)
                    .ok_or_else(|| BizOpsError::not_found(PROJECT_ENTITY, item.id))?;
                project.priority_score = score;
                project.priority_calculated_at = Some(calculated_at);
            }
        }
        Ok(())
    }

    async fn top_open_tasks(
        &self,
        owner_id: i64,
        limit: usize,
    ) -> BizOpsResult<Vec<PriorityCandidate>> {
        let state = self.state.lock().unwrap();
        let mut candidates: Vec<PriorityCandidate> = state
            .tasks
            .values()
            .filter(|t| t.owner_id == owner_id && t.is_open())
            .map(|t| PriorityCandidate {
                item: ItemRef::task(t.id),
                title: t.title.clone(),
                priority_score: t.priority_score,
                deadline: t.deadline,
                created_at: t.created_at,
            })
            .collect();
        candidates.sort_by(candidate_order);
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn top_open_projects(
        &self,
        owner_id: i64,
        limit: usize,
    ) -> BizOpsResult<Vec<PriorityCandidate>> {
        let state = self.state.lock().unwrap();
        let mut candidates: Vec<PriorityCandidate> = state
            .projects
            .values()
            .filter(|p| p.owner_id == owner_id && p.is_open())
            .map(|p| PriorityCandidate {
                item: ItemRef::project(p.id),
                title: p.name.clone(),
                priority_score: p.priority_score,
                deadline: p.deadline,
                created_at: p.created_at,
            })
            .collect();
        candidates.sort_by(candidate_order);
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn list_open_items(&self, owner_id: i64) -> BizOpsResult<Vec<ItemRef>> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<ItemRef> = state
            .tasks
            .values()
            .filter(|t| t.owner_id == owner_id && t.is_open())
            .map(|t| ItemRef::task(t.id))
            .chain(
                state
                    .projects
                    .values()
                    .filter(|p| p.owner_id == owner_id && p.is_open())
                    .map(|p| ItemRef::project(p.id)),
            )
            .collect();
        items.sort_by_key(|i| (i.kind, i.id));
        Ok(items)
    }
}

#[async_trait]
impl RecurringPaymentRepository for MockStore {
    async fn find_by_id(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<RecurringPayment>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .obligations
            .get(&id)
            .filter(|o| o.owner_id == owner_id)
            .cloned())
    }

    async fn list(&self, owner_id: i64) -> BizOpsResult<Vec<RecurringPayment>> {
        let state = self.state.lock().unwrap();
        let mut obligations: Vec<RecurringPayment> = state
            .obligations
            .values()
            .filter(|o| o.owner_id == owner_id)
            .cloned()
            .collect();
        obligations.sort_by_key(|o| o.id);
        Ok(obligations)
    }

    async fn create_with_first_payment(
        &self,
        obligation: &RecurringPayment,
    ) -> BizOpsResult<(RecurringPayment, Payment)> {
        self.check_obligation_writes()?;
        let mut state = self.state.lock().unwrap();
        let mut obligation = obligation.clone();
        obligation.id = state.allocate_id();
        let mut payment =
            Payment::for_obligation(&obligation, obligation.next_due_date, obligation.created_at);
        payment.id = state.allocate_id();
        state.obligations.insert(obligation.id, obligation.clone());
        state.payments.insert(payment.id, payment.clone());
        Ok((obligation, payment))
    }

    async fn apply_advance(
        &self,
        obligation: &RecurringPayment,
        plan: AdvancePlan,
        payment: &Payment,
    ) -> BizOpsResult<(RecurringPayment, Payment)> {
        self.check_obligation_writes()?;
        let mut state = self.state.lock().unwrap();
        let stored = state
            .obligations
            .get(&obligation.id)
            .ok_or_else(|| BizOpsError::not_found(OBLIGATION_ENTITY, obligation.id))?;
        if stored.status != ObligationStatus::Active
            || stored.next_due_date != plan.previous_due_date
        {
            return Err(BizOpsError::invalid_transition(
                OBLIGATION_ENTITY,
                obligation.id,
                stored.status,
                "advance",
            ));
        }
        let mut payment = payment.clone();
        payment.id = state.allocate_id();
        state.obligations.insert(obligation.id, obligation.clone());
        state.payments.insert(payment.id, payment.clone());
        Ok((obligation.clone(), payment))
    }

    async fn update(
        &self,
        obligation: &RecurringPayment,
        expected_status: ObligationStatus,
    ) -> BizOpsResult<RecurringPayment> {
        self.check_obligation_writes()?;
        let mut state = self.state.lock().unwrap();
        let stored = state
            .obligations
            .get_mut(&obligation.id)
            .filter(|o| o.owner_id == obligation.owner_id)
            .ok_or_else(|| BizOpsError::not_found(OBLIGATION_ENTITY, obligation.id))?;
        if stored.status != expected_status || stored.next_due_date != obligation.next_due_date {
            return Err(BizOpsError::invalid_transition(
                OBLIGATION_ENTITY,
                obligation.id,
                stored.status,
                "update",
            ));
        }
        stored.amount = obligation.amount;
        stored.frequency = obligation.frequency;
        stored.end_date = obligation.end_date;
        stored.status = obligation.status;
        stored.updated_at = obligation.updated_at;
        Ok(stored.clone())
    }

    async fn delete(&self, owner_id: i64, id: i64) -> BizOpsResult<bool> {
        let mut state = self.state.lock().unwrap();
        let owned = state
            .obligations
            .get(&id)
            .map(|o| o.owner_id == owner_id)
            .unwrap_or(false);
        if owned {
            state.obligations.remove(&id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl PaymentRepository for MockStore {
    async fn find_by_id(&self, owner_id: i64, id: i64) -> BizOpsResult<Option<Payment>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .payments
            .get(&id)
            .filter(|p| p.owner_id == owner_id)
            .cloned())
    }

    async fn list_by_obligation(
        &self,
        owner_id: i64,
        obligation_id: i64,
    ) -> BizOpsResult<Vec<Payment>> {
        Ok(self
            .payments_for(obligation_id)
            .into_iter()
            .filter(|p| p.owner_id == owner_id)
            .collect())
    }

    async fn count_by_obligation(&self, obligation_id: i64) -> BizOpsResult<usize> {
        Ok(self.payments_for(obligation_id).len())
    }

    async fn mark_paid(&self, payment: &Payment) -> BizOpsResult<Payment> {
        let mut state = self.state.lock().unwrap();
        let stored = state
            .payments
            .get(&payment.id)
            .ok_or_else(|| BizOpsError::not_found(PAYMENT_ENTITY, payment.id))?;
        if !stored.status.is_collectible() {
            return Err(BizOpsError::invalid_transition(
                PAYMENT_ENTITY,
                payment.id,
                stored.status,
                "mark_paid",
            ));
        }
        if !state.clients.contains_key(&payment.client_id) {
            return Err(BizOpsError::database_error(format!(
                "客户不存在: {}",
                payment.client_id
            )));
        }
        if let Some(client) = state.clients.get_mut(&payment.client_id) {
            client.total_revenue += payment.amount;
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(payment.clone())
    }

    async fn update_status(&self, payment: &Payment) -> BizOpsResult<Payment> {
        let mut state = self.state.lock().unwrap();
        if !state.payments.contains_key(&payment.id) {
            return Err(BizOpsError::not_found(PAYMENT_ENTITY, payment.id));
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(payment.clone())
    }

    async fn mark_overdue(&self, owner_id: i64, today: NaiveDate) -> BizOpsResult<u64> {
        let mut state = self.state.lock().unwrap();
        let mut updated = 0;
        for payment in state.payments.values_mut() {
            if payment.owner_id == owner_id
                && payment.status == PaymentStatus::Pending
                && payment.due_date < today
            {
                payment.status = PaymentStatus::Overdue;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

/// 记录到的开票服务调用
#[derive(Debug, Clone, PartialEq)]
pub enum BillingCall {
    Create(RetainerSpec),
    Update {
        retainer_id: String,
        update: RetainerUpdate,
    },
    Documents(String),
}

/// 记录所有调用的开票服务替身，可按需注入失败
#[derive(Debug, Clone)]
pub struct RecordingBillingGateway {
    calls: Arc<Mutex<Vec<BillingCall>>>,
    fail_create: Arc<AtomicBool>,
    fail_update: Arc<AtomicBool>,
    supports_sub_monthly: bool,
    documents: Arc<Mutex<Vec<RetainerDocument>>>,
    update_delay: Option<Duration>,
}

impl RecordingBillingGateway {
    /// 与真实服务一致：不支持 DAILY / WEEKLY
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_create: Arc::new(AtomicBool::new(false)),
            fail_update: Arc::new(AtomicBool::new(false)),
            supports_sub_monthly: false,
            documents: Arc::new(Mutex::new(Vec::new())),
            update_delay: None,
        }
    }

    pub fn accepting_all_frequencies() -> Self {
        Self {
            supports_sub_monthly: true,
            ..Self::new()
        }
    }

    pub fn with_documents(self, documents: Vec<RetainerDocument>) -> Self {
        *self.documents.lock().unwrap() = documents;
        self
    }

    /// update_retainer 记录调用后先等待再返回，模拟慢速远端
    pub fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = Some(delay);
        self
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<BillingCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, RetainerUpdate)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BillingCall::Update {
                    retainer_id,
                    update,
                } => Some((retainer_id, update)),
                _ => None,
            })
            .collect()
    }
}

impl Default for RecordingBillingGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BillingGateway for RecordingBillingGateway {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn supports_frequency(&self, frequency: Frequency) -> bool {
        self.supports_sub_monthly
            || matches!(
                frequency,
                Frequency::Monthly | Frequency::Quarterly | Frequency::Yearly
            )
    }

    async fn create_retainer(&self, spec: &RetainerSpec) -> BizOpsResult<Option<String>> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(BillingCall::Create(spec.clone()));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BizOpsError::external_sync("create_retainer", "模拟的远端故障"));
        }
        Ok(Some(format!("ret-{}", calls.len())))
    }

    async fn update_retainer(&self, retainer_id: &str, update: &RetainerUpdate) -> BizOpsResult<()> {
        self.calls.lock().unwrap().push(BillingCall::Update {
            retainer_id: retainer_id.to_string(),
            update: update.clone(),
        });
        if let Some(delay) = self.update_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(BizOpsError::external_sync("update_retainer", "模拟的远端故障"));
        }
        Ok(())
    }

    async fn retainer_documents(&self, retainer_id: &str) -> BizOpsResult<Vec<RetainerDocument>> {
        self.calls
            .lock()
            .unwrap()
            .push(BillingCall::Documents(retainer_id.to_string()));
        Ok(self.documents.lock().unwrap().clone())
    }
}

/// 记录领域事件的活动记录器
#[derive(Debug, Clone, Default)]
pub struct RecordingActivityRecorder {
    events: Arc<Mutex<Vec<ObligationEvent>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingActivityRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的 record 调用都返回错误（事件仍被记下）
    pub fn failing() -> Self {
        let recorder = Self::default();
        recorder.failing.store(true, Ordering::SeqCst);
        recorder
    }

    pub fn events(&self) -> Vec<ObligationEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityRecorder for RecordingActivityRecorder {
    async fn record(&self, event: &ObligationEvent) -> BizOpsResult<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(BizOpsError::Internal("模拟的活动记录失败".to_string()));
        }
        Ok(())
    }
}
