use std::fmt::Display;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        }
    }
}

/// 安装全局 subscriber。`RUST_LOG` 存在时优先于传入的级别。
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true);
            registry
                .with(fmt_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("初始化日志失败: {}", e))?;
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(false)
                .with_line_number(false);
            registry
                .with(fmt_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("初始化日志失败: {}", e))?;
        }
    }

    info!(
        logging.format = format.as_str(),
        logging.level = level,
        "Structured logging initialized"
    );

    Ok(())
}

/// 业务事件日志，每条记录带 `event` 字段便于检索
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_score_calculated(kind: &str, item_id: i64, score: u8, reason: &str) {
        debug!(
            event = "score_calculated",
            item.kind = kind,
            item.id = item_id,
            score = score,
            reason = reason,
            "Priority score calculated"
        );
    }

    pub fn log_obligation_created(
        obligation_id: i64,
        owner_id: i64,
        payment_id: i64,
        external_retainer_id: Option<&str>,
    ) {
        info!(
            event = "obligation_created",
            obligation.id = obligation_id,
            owner.id = owner_id,
            payment.id = payment_id,
            retainer.id = external_retainer_id.unwrap_or("-"),
            "Recurring obligation created"
        );
    }

    pub fn log_obligation_advanced(
        obligation_id: i64,
        payment_id: i64,
        previous_due: impl Display,
        next_due: impl Display,
    ) {
        info!(
            event = "obligation_advanced",
            obligation.id = obligation_id,
            payment.id = payment_id,
            obligation.previous_due = %previous_due,
            obligation.next_due = %next_due,
            "Recurring obligation advanced"
        );
    }

    pub fn log_obligation_state_changed(obligation_id: i64, from: &str, to: &str) {
        info!(
            event = "obligation_state_changed",
            obligation.id = obligation_id,
            obligation.from = from,
            obligation.to = to,
            "Recurring obligation status changed"
        );
    }

    pub fn log_payment_paid(payment_id: i64, client_id: i64, amount: impl Display) {
        info!(
            event = "payment_paid",
            payment.id = payment_id,
            client.id = client_id,
            payment.amount = %amount,
            "Payment marked as paid"
        );
    }

    pub fn log_billing_sync_failed(operation: &str, obligation_id: Option<i64>, error: &str) {
        warn!(
            event = "billing_sync_failed",
            billing.operation = operation,
            obligation.id = obligation_id,
            error = error,
            "Billing provider sync failed"
        );
    }

    /// 远端已更新但本地提交失败
    pub fn log_billing_divergence(operation: &str, obligation_id: i64, error: &str) {
        error!(
            event = "billing_divergence",
            billing.operation = operation,
            obligation.id = obligation_id,
            error = error,
            "Billing provider updated but local commit failed"
        );
    }
}
