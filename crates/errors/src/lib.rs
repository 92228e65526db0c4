use thiserror::Error;

#[derive(Debug, Error)]
pub enum BizOpsError {
    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),
    #[error("{entity}未找到: {id}")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{entity} {id} 当前状态 {from} 不允许执行操作: {action}")]
    InvalidStateTransition {
        entity: &'static str,
        id: i64,
        from: String,
        action: &'static str,
    },
    #[error("周期账单 {id} 未处于激活状态 (当前状态: {status})")]
    ObligationNotActive { id: i64, status: String },
    #[error("周期账单 {id} 已产生 {payment_count} 条付款记录，禁止删除")]
    DeletionRejected { id: i64, payment_count: usize },
    #[error("数据验证失败: {0}")]
    ValidationError(String),
    #[error("外部账单同步失败 [{operation}]: {message}")]
    ExternalSync {
        operation: &'static str,
        message: String,
    },
    #[error("操作超时: {0}")]
    Timeout(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type BizOpsResult<T> = Result<T, BizOpsError>;

impl BizOpsError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
    pub fn invalid_transition<S: ToString>(
        entity: &'static str,
        id: i64,
        from: S,
        action: &'static str,
    ) -> Self {
        Self::InvalidStateTransition {
            entity,
            id,
            from: from.to_string(),
            action,
        }
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
    pub fn external_sync<S: Into<String>>(operation: &'static str, msg: S) -> Self {
        Self::ExternalSync {
            operation,
            message: msg.into(),
        }
    }
    pub fn timeout_error<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// 调用方在写入前即可拒绝的错误（未找到 / 状态非法 / 校验失败）
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BizOpsError::NotFound { .. }
                | BizOpsError::InvalidStateTransition { .. }
                | BizOpsError::ObligationNotActive { .. }
                | BizOpsError::DeletionRejected { .. }
                | BizOpsError::ValidationError(_)
        )
    }
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BizOpsError::DatabaseOperation(_)
                | BizOpsError::ExternalSync { .. }
                | BizOpsError::Timeout(_)
        )
    }
    pub fn user_message(&self) -> &str {
        match self {
            BizOpsError::NotFound { .. } => "请求的记录不存在",
            BizOpsError::ObligationNotActive { .. } => "周期账单未激活，无法推进到下一账期",
            BizOpsError::InvalidStateTransition { .. } => "当前状态不允许此操作",
            BizOpsError::DeletionRejected { .. } => "已有付款记录的周期账单只能停用，不能删除",
            BizOpsError::ValidationError(_) => "输入数据验证失败",
            BizOpsError::ExternalSync { .. } => "外部开票服务不可用，请稍后重试",
            BizOpsError::Timeout(_) => "操作超时，请稍后重试",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<sqlx::Error> for BizOpsError {
    fn from(err: sqlx::Error) -> Self {
        BizOpsError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for BizOpsError {
    fn from(err: serde_json::Error) -> Self {
        BizOpsError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for BizOpsError {
    fn from(err: anyhow::Error) -> Self {
        BizOpsError::Internal(err.to_string())
    }
}
