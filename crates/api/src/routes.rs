use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use bizops_application::{PaymentService, PriorityService, RecommendationService, RecurringService};

use crate::handlers::{
    health::health_check,
    metrics::prometheus_metrics,
    obligations::{
        advance, cancel, complete, create_obligation, delete_obligation, get_obligation,
        list_obligations, pause, payment_history, resume, retainer_documents, update_terms,
    },
    payments::{cancel_payment, mark_paid, refresh_overdue},
    priorities::{recalculate_all, recommended_today, score_project, score_task, top_priorities},
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub priority: Arc<PriorityService>,
    pub recommendations: Arc<RecommendationService>,
    pub recurring: Arc<RecurringService>,
    pub payments: Arc<PaymentService>,
    pub metrics: Option<PrometheusHandle>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        // 优先级与推荐
        .route("/api/priorities/top", get(top_priorities))
        .route("/api/priorities/today", get(recommended_today))
        .route("/api/priorities/recalculate", post(recalculate_all))
        .route("/api/tasks/{id}/score", post(score_task))
        .route("/api/projects/{id}/score", post(score_project))
        // 周期账单
        .route(
            "/api/obligations",
            get(list_obligations).post(create_obligation),
        )
        .route(
            "/api/obligations/{id}",
            get(get_obligation)
                .patch(update_terms)
                .delete(delete_obligation),
        )
        .route("/api/obligations/{id}/advance", post(advance))
        .route("/api/obligations/{id}/pause", post(pause))
        .route("/api/obligations/{id}/resume", post(resume))
        .route("/api/obligations/{id}/cancel", post(cancel))
        .route("/api/obligations/{id}/complete", post(complete))
        .route("/api/obligations/{id}/payments", get(payment_history))
        .route("/api/obligations/{id}/documents", get(retainer_documents))
        // 付款
        .route("/api/payments/refresh-overdue", post(refresh_overdue))
        .route("/api/payments/{id}/pay", post(mark_paid))
        .route("/api/payments/{id}/cancel", post(cancel_payment))
        .with_state(state)
}
