use axum::{
    extract::{rejection::JsonRejection, FromRequestParts},
    http::request::Parts,
    Json,
};

use crate::error::{ApiError, ApiResult};

pub const OWNER_HEADER: &str = "x-owner-id";

/// 租户 ID，取自 `X-Owner-Id` 请求头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub i64);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(OwnerId)
            .ok_or(ApiError::MissingOwner)
    }
}

/// 请求体解析失败时返回统一的错误信封
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}
