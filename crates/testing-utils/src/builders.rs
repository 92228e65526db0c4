//! Test data builders for creating test entities
//!
//! 构建器只填充内存对象，ID 由仓储在保存时分配。

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use bizops_domain::{
    Client, ClientTier, Frequency, NewObligation, Project, ProjectStage, ProjectStatus, Task,
    TaskStatus,
};

use crate::helpers::{date, money, utc};

pub const TEST_OWNER: i64 = 7;

pub struct ClientBuilder {
    client: Client,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            client: Client::new(TEST_OWNER, "Acme".to_string(), ClientTier::Regular),
        }
    }

    pub fn with_owner(mut self, owner_id: i64) -> Self {
        self.client.owner_id = owner_id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.client.name = name.to_string();
        self
    }

    pub fn vip(mut self) -> Self {
        self.client.tier = ClientTier::Vip;
        self
    }

    pub fn build(self) -> Client {
        self.client
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new() -> Self {
        let mut task = Task::new(TEST_OWNER, "test task".to_string());
        task.created_at = utc(2024, 1, 1, 0);
        Self { task }
    }

    pub fn with_owner(mut self, owner_id: i64) -> Self {
        self.task.owner_id = owner_id;
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.task.title = title.to_string();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.task.deadline = Some(deadline);
        self
    }

    pub fn in_project(mut self, project_id: i64) -> Self {
        self.task.project_id = Some(project_id);
        self
    }

    pub fn for_client(mut self, client_id: i64) -> Self {
        self.task.client_id = Some(client_id);
        self
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.task.priority_score = score;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.task.created_at = created_at;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ProjectBuilder {
    project: Project,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        let mut project = Project::new(TEST_OWNER, "test project".to_string());
        project.created_at = utc(2024, 1, 1, 0);
        Self { project }
    }

    pub fn with_owner(mut self, owner_id: i64) -> Self {
        self.project.owner_id = owner_id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.project.name = name.to_string();
        self
    }

    pub fn with_stage(mut self, stage: ProjectStage) -> Self {
        self.project.stage = stage;
        self
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.project.status = status;
        self
    }

    pub fn with_budget(mut self, budget: &str) -> Self {
        self.project.budget = Some(money(budget));
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.project.deadline = Some(deadline);
        self
    }

    pub fn for_client(mut self, client_id: i64) -> Self {
        self.project.client_id = Some(client_id);
        self
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.project.priority_score = score;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.project.created_at = created_at;
        self
    }

    pub fn build(self) -> Project {
        self.project
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 默认：每月 1000，首个到期日 2024-01-31，无结束日期
pub struct NewObligationBuilder {
    request: NewObligation,
}

impl NewObligationBuilder {
    pub fn new(client_id: i64) -> Self {
        Self {
            request: NewObligation {
                client_id,
                name: "Monthly retainer".to_string(),
                amount: money("1000.00"),
                frequency: Frequency::Monthly,
                next_due_date: date(2024, 1, 31),
                end_date: None,
            },
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.request.name = name.to_string();
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.request.amount = amount;
        self
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.request.frequency = frequency;
        self
    }

    pub fn starting(mut self, next_due_date: NaiveDate) -> Self {
        self.request.next_due_date = next_due_date;
        self
    }

    pub fn ending(mut self, end_date: NaiveDate) -> Self {
        self.request.end_date = Some(end_date);
        self
    }

    pub fn build(self) -> NewObligation {
        self.request
    }
}
