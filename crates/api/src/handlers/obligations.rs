use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use bizops_domain::{NewObligation, ObligationTermsUpdate, Payment, RecurringPayment};

use crate::{
    error::ApiResult,
    extractors::{json_body, OwnerId},
    response::Reply,
    routes::AppState,
};

#[derive(Debug, Serialize)]
pub struct CreatedObligation {
    pub obligation: RecurringPayment,
    pub first_payment: Payment,
}

pub async fn list_obligations(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> ApiResult<impl IntoResponse> {
    let obligations = state.recurring.list(owner_id).await?;
    Ok(Reply::ok(obligations))
}

pub async fn create_obligation(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    payload: Result<Json<NewObligation>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = json_body(payload)?;
    let (obligation, first_payment) = state.recurring.create(owner_id, request).await?;
    Ok(Reply::created(CreatedObligation {
        obligation,
        first_payment,
    }))
}

pub async fn get_obligation(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let obligation = state.recurring.get(owner_id, id).await?;
    Ok(Reply::ok(obligation))
}

pub async fn update_terms(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
    payload: Result<Json<ObligationTermsUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let terms = json_body(payload)?;
    let obligation = state.recurring.update_terms(owner_id, id, terms).await?;
    Ok(Reply::ok(obligation))
}

pub async fn delete_obligation(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.recurring.delete(owner_id, id).await?;
    Ok(Reply::done(format!("周期账单 {id} 已删除")))
}

pub async fn advance(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.recurring.advance(owner_id, id).await?;
    Ok(Reply::ok(outcome))
}

pub async fn pause(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Reply::ok(state.recurring.pause(owner_id, id).await?))
}

pub async fn resume(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Reply::ok(state.recurring.resume(owner_id, id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Reply::ok(state.recurring.cancel(owner_id, id).await?))
}

pub async fn complete(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Reply::ok(state.recurring.complete(owner_id, id).await?))
}

pub async fn payment_history(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let payments = state.payments.list_for_obligation(owner_id, id).await?;
    Ok(Reply::ok(payments))
}

pub async fn retainer_documents(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let documents = state.recurring.retainer_documents(owner_id, id).await?;
    Ok(Reply::ok(documents))
}
