use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::ApiResult,
    extractors::OwnerId,
    response::Reply,
    routes::AppState,
};

pub async fn mark_paid(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let payment = state.payments.mark_paid(owner_id, id).await?;
    Ok(Reply::ok(payment))
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let payment = state.payments.cancel(owner_id, id).await?;
    Ok(Reply::ok(payment))
}

/// 把已过期的待付款落库为 OVERDUE
pub async fn refresh_overdue(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> ApiResult<impl IntoResponse> {
    let updated = state.payments.refresh_overdue(owner_id).await?;
    Ok(Reply::ok(json!({ "updated": updated }))
        .with_message(format!("{updated} 条付款已标记为逾期")))
}
