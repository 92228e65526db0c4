//! 行到实体的映射，以及 TEXT 金额 / INTEGER 分数的解析

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use bizops_domain::{
    Client, ItemRef, Payment, PriorityCandidate, Project, RecurringPayment, Task,
};
use bizops_errors::{BizOpsError, BizOpsResult};

pub struct MappingHelpers;

impl MappingHelpers {
    pub fn decimal(row: &SqliteRow, field_name: &str) -> BizOpsResult<Decimal> {
        let text: String = row.try_get(field_name)?;
        Self::parse_decimal(field_name, &text)
    }

    pub fn optional_decimal(row: &SqliteRow, field_name: &str) -> BizOpsResult<Option<Decimal>> {
        row.try_get::<Option<String>, _>(field_name)?
            .map(|text| Self::parse_decimal(field_name, &text))
            .transpose()
    }

    pub fn parse_decimal(field_name: &str, text: &str) -> BizOpsResult<Decimal> {
        Decimal::from_str(text).map_err(|e| {
            BizOpsError::Serialization(format!("解析金额字段 {field_name} 失败 ({text}): {e}"))
        })
    }

    /// 分数列越界时截断到 0..=100
    pub fn score(row: &SqliteRow, field_name: &str) -> BizOpsResult<u8> {
        let raw: i64 = row.try_get(field_name)?;
        Ok(raw.clamp(0, 100) as u8)
    }

    /// 计算列（COALESCE 等）没有声明类型，按文本读取后再解析
    pub fn parsed_text<T: FromStr<Err = String>>(
        row: &SqliteRow,
        field_name: &str,
    ) -> BizOpsResult<Option<T>> {
        row.try_get::<Option<String>, _>(field_name)?
            .map(|text| text.parse::<T>().map_err(BizOpsError::Serialization))
            .transpose()
    }
}

pub fn row_to_client(row: &SqliteRow) -> BizOpsResult<Client> {
    Ok(Client {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        tier: row.try_get("tier")?,
        total_revenue: MappingHelpers::decimal(row, "total_revenue")?,
        created_at: row.try_get("created_at")?,
    })
}

pub fn row_to_task(row: &SqliteRow) -> BizOpsResult<Task> {
    Ok(Task {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        project_id: row.try_get("project_id")?,
        client_id: row.try_get("client_id")?,
        status: row.try_get("status")?,
        deadline: row.try_get("deadline")?,
        priority_score: MappingHelpers::score(row, "priority_score")?,
        priority_calculated_at: row.try_get("priority_calculated_at")?,
        created_at: row.try_get("created_at")?,
    })
}

pub fn row_to_project(row: &SqliteRow) -> BizOpsResult<Project> {
    Ok(Project {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        client_id: row.try_get("client_id")?,
        stage: row.try_get("stage")?,
        status: row.try_get("status")?,
        budget: MappingHelpers::optional_decimal(row, "budget")?,
        deadline: row.try_get("deadline")?,
        priority_score: MappingHelpers::score(row, "priority_score")?,
        priority_calculated_at: row.try_get("priority_calculated_at")?,
        created_at: row.try_get("created_at")?,
    })
}

/// 候选查询统一把标题列别名为 `title`
pub fn row_to_candidate(row: &SqliteRow, item: fn(i64) -> ItemRef) -> BizOpsResult<PriorityCandidate> {
    Ok(PriorityCandidate {
        item: item(row.try_get("id")?),
        title: row.try_get("title")?,
        priority_score: MappingHelpers::score(row, "priority_score")?,
        deadline: row.try_get("deadline")?,
        created_at: row.try_get("created_at")?,
    })
}

pub fn row_to_obligation(row: &SqliteRow) -> BizOpsResult<RecurringPayment> {
    Ok(RecurringPayment {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        client_id: row.try_get("client_id")?,
        name: row.try_get("name")?,
        amount: MappingHelpers::decimal(row, "amount")?,
        frequency: row.try_get("frequency")?,
        next_due_date: row.try_get("next_due_date")?,
        last_paid_date: row.try_get("last_paid_date")?,
        end_date: row.try_get("end_date")?,
        status: row.try_get("status")?,
        external_retainer_id: row.try_get("external_retainer_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn row_to_payment(row: &SqliteRow) -> BizOpsResult<Payment> {
    Ok(Payment {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        client_id: row.try_get("client_id")?,
        project_id: row.try_get("project_id")?,
        recurring_payment_id: row.try_get("recurring_payment_id")?,
        amount: MappingHelpers::decimal(row, "amount")?,
        status: row.try_get("status")?,
        due_date: row.try_get("due_date")?,
        paid_at: row.try_get("paid_at")?,
        invoice_number: row.try_get("invoice_number")?,
        created_at: row.try_get("created_at")?,
    })
}
