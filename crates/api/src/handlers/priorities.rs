use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use bizops_domain::ItemRef;

use crate::{
    error::{ApiError, ApiResult},
    extractors::OwnerId,
    response::Reply,
    routes::AppState,
};

pub const DEFAULT_TOP_LIMIT: usize = 10;
pub const MAX_TOP_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub limit: Option<usize>,
}

pub async fn top_priorities(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    query: Result<Query<TopQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    if limit > MAX_TOP_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit 不能超过 {MAX_TOP_LIMIT}"
        )));
    }

    let items = state
        .recommendations
        .top_priority_items(owner_id, limit)
        .await?;
    Ok(Reply::ok(items))
}

pub async fn recommended_today(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> ApiResult<impl IntoResponse> {
    let items = state.recommendations.recommended_for_today(owner_id).await?;
    Ok(Reply::ok(items))
}

pub async fn score_task(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let scored = state
        .priority
        .calculate_and_persist(owner_id, ItemRef::task(id))
        .await?;
    Ok(Reply::ok(scored))
}

pub async fn score_project(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let scored = state
        .priority
        .calculate_and_persist(owner_id, ItemRef::project(id))
        .await?;
    Ok(Reply::ok(scored))
}

pub async fn recalculate_all(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> ApiResult<impl IntoResponse> {
    let report = state.priority.recalculate_all(owner_id).await?;
    let message = format!(
        "已重算 {} 条，失败 {} 条",
        report.succeeded,
        report.failed.len()
    );
    Ok(Reply::ok(report).with_message(message))
}
