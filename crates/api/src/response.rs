//! 响应信封
//!
//! 成功与失败共用 `Envelope`：失败时 `data` 为 null 并带 `error` 字段。
//! 处理函数返回 `Reply`，由它决定状态码。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub timestamp: DateTime<Utc>,
}

impl<T> Envelope<T> {
    fn ok(data: Option<T>, message: Option<String>) -> Self {
        Self {
            success: true,
            data,
            message,
            error: None,
            timestamp: Utc::now(),
        }
    }
}

impl Envelope<()> {
    pub fn failure(status: StatusCode, kind: &str, message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            error: Some(ErrorDetail {
                kind: kind.to_string(),
                code: status.as_u16(),
            }),
            timestamp: Utc::now(),
        }
    }
}

/// 处理函数的成功返回值
#[derive(Debug)]
pub struct Reply<T> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl<T: Serialize> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope::ok(Some(data), None),
        }
    }

    /// 201，用于新建资源
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.envelope.message = Some(message.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl Reply<()> {
    /// 没有数据，只有提示
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope::ok(None, Some(message.into())),
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}
