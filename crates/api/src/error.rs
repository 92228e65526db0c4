use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use bizops_errors::BizOpsError;

use crate::response::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] BizOpsError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("缺少或无效的 X-Owner-Id 请求头")]
    MissingOwner,

    #[error("未找到资源")]
    NotFound,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Domain(err) => match err {
                BizOpsError::NotFound { .. } => StatusCode::NOT_FOUND,
                BizOpsError::InvalidStateTransition { .. }
                | BizOpsError::ObligationNotActive { .. }
                | BizOpsError::DeletionRejected { .. } => StatusCode::CONFLICT,
                BizOpsError::ValidationError(_) => StatusCode::BAD_REQUEST,
                BizOpsError::ExternalSync { .. } => StatusCode::BAD_GATEWAY,
                BizOpsError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                BizOpsError::DatabaseOperation(_)
                | BizOpsError::Serialization(_)
                | BizOpsError::Configuration(_)
                | BizOpsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) | ApiError::MissingOwner => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Domain(err) => match err {
                BizOpsError::NotFound { .. } => "NOT_FOUND",
                BizOpsError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
                BizOpsError::ObligationNotActive { .. } => "OBLIGATION_NOT_ACTIVE",
                BizOpsError::DeletionRejected { .. } => "DELETION_REJECTED",
                BizOpsError::ValidationError(_) => "VALIDATION_ERROR",
                BizOpsError::ExternalSync { .. } => "EXTERNAL_SYNC_FAILED",
                BizOpsError::Timeout(_) => "TIMEOUT",
                _ => "INTERNAL_ERROR",
            },
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::MissingOwner => "MISSING_OWNER",
            ApiError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // 服务端错误只返回通用提示，细节写日志
        let message = match &self {
            ApiError::Domain(err) if status.is_server_error() => {
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!("请求处理失败: {}", err);
                } else {
                    warn!("外部依赖失败: {}", err);
                }
                err.user_message().to_string()
            }
            other => other.to_string(),
        };

        let body = Envelope::failure(status, self.error_type(), message);
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_status_codes() {
        let cases = vec![
            (BizOpsError::not_found("周期账单", 1), StatusCode::NOT_FOUND),
            (
                BizOpsError::invalid_transition("付款", 1, "PAID", "mark_paid"),
                StatusCode::CONFLICT,
            ),
            (
                BizOpsError::ObligationNotActive {
                    id: 1,
                    status: "PAUSED".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                BizOpsError::DeletionRejected {
                    id: 1,
                    payment_count: 2,
                },
                StatusCode::CONFLICT,
            ),
            (BizOpsError::validation_error("金额必须大于0"), StatusCode::BAD_REQUEST),
            (
                BizOpsError::external_sync("create_retainer", "HTTP 503"),
                StatusCode::BAD_GATEWAY,
            ),
            (BizOpsError::timeout_error("update_retainer"), StatusCode::GATEWAY_TIMEOUT),
            (
                BizOpsError::database_error("disk I/O error"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_missing_owner_is_bad_request() {
        let response = ApiError::MissingOwner.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_api_error_display() {
        let error = ApiError::NotFound;
        assert_eq!(format!("{}", error), "未找到资源");
    }
}
