//! HTTP 接口层：优先级推荐、周期账单与付款的 REST 路由

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::{OwnerId, OWNER_HEADER};
pub use response::{Envelope, Reply};
pub use routes::{create_routes, AppState};

use axum::Router;
use tower::ServiceBuilder;

/// 组装路由与中间件
pub fn create_app(state: AppState, cors_enabled: bool) -> Router {
    let app = create_routes(state).layer(
        ServiceBuilder::new()
            .layer(middleware::trace_layer())
            .layer(axum::middleware::from_fn(middleware::request_logging)),
    );

    if cors_enabled {
        app.layer(middleware::cors_layer())
    } else {
        app
    }
}
