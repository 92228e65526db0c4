//! 内嵌的幂等建表语句，启动时执行
//!
//! 金额以 TEXT 存储，读取时用 `rust_decimal` 解析；日期为 `YYYY-MM-DD`，时间为 RFC3339。

use sqlx::SqlitePool;
use tracing::info;

use bizops_errors::BizOpsResult;

const TABLES: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        tier TEXT NOT NULL DEFAULT 'REGULAR',
        total_revenue TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        client_id INTEGER REFERENCES clients(id),
        stage TEXT NOT NULL DEFAULT 'PLANNING',
        status TEXT NOT NULL DEFAULT 'ACTIVE',
        budget TEXT,
        deadline TEXT,
        priority_score INTEGER NOT NULL DEFAULT 0,
        priority_calculated_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        project_id INTEGER REFERENCES projects(id),
        client_id INTEGER REFERENCES clients(id),
        status TEXT NOT NULL DEFAULT 'TODO',
        deadline TEXT,
        priority_score INTEGER NOT NULL DEFAULT 0,
        priority_calculated_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS recurring_payments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        client_id INTEGER NOT NULL REFERENCES clients(id),
        name TEXT NOT NULL,
        amount TEXT NOT NULL,
        frequency TEXT NOT NULL,
        next_due_date TEXT NOT NULL,
        last_paid_date TEXT,
        end_date TEXT,
        status TEXT NOT NULL DEFAULT 'ACTIVE',
        external_retainer_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        client_id INTEGER NOT NULL REFERENCES clients(id),
        project_id INTEGER REFERENCES projects(id),
        recurring_payment_id INTEGER REFERENCES recurring_payments(id),
        amount TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING',
        due_date TEXT NOT NULL,
        paid_at TEXT,
        invoice_number TEXT,
        created_at TEXT NOT NULL
    )
    "#,
];

const INDEXES: [&str; 7] = [
    "CREATE INDEX IF NOT EXISTS idx_clients_owner ON clients(owner_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_owner_score ON tasks(owner_id, priority_score DESC)",
    "CREATE INDEX IF NOT EXISTS idx_projects_owner_score ON projects(owner_id, priority_score DESC)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_recurring_payments_owner ON recurring_payments(owner_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_payments_obligation ON payments(recurring_payment_id)",
    "CREATE INDEX IF NOT EXISTS idx_payments_owner_status ON payments(owner_id, status, due_date)",
];

pub async fn run_migrations(pool: &SqlitePool) -> BizOpsResult<()> {
    for statement in TABLES.iter().chain(INDEXES.iter()) {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("数据库迁移完成");
    Ok(())
}
