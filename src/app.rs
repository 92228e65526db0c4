use std::sync::Arc;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{info, warn};

use bizops_api::{create_app, AppState};
use bizops_application::{PaymentService, PriorityService, RecommendationService, RecurringService};
use bizops_core::{install_prometheus_recorder, AppConfig};
use bizops_domain::{BillingGateway, Clock, SystemClock};
use bizops_infrastructure::{
    DatabaseManager, HttpBillingGateway, NoopBillingGateway, TracingActivityRecorder,
};

/// 主应用程序
pub struct Application {
    config: AppConfig,
    database: DatabaseManager,
    state: AppState,
}

impl Application {
    /// 创建数据库连接、开票网关和各业务服务
    pub async fn new(config: AppConfig) -> Result<Self> {
        let metrics = create_metrics_handle(&config);

        let database = DatabaseManager::new(&config.database)
            .await
            .context("连接数据库失败")?;
        database.migrate().await.context("执行数据库迁移失败")?;
        info!("数据库已就绪: {}", config.database.url);

        let billing = create_billing_gateway(&config)?;
        let activity = Arc::new(TracingActivityRecorder::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let work_items = database.work_item_repository();
        let obligations = database.recurring_payment_repository();
        let payments = database.payment_repository();

        let state = AppState {
            priority: Arc::new(PriorityService::new(
                work_items.clone(),
                clock.clone(),
                config.scoring.recalc_concurrency,
            )),
            recommendations: Arc::new(RecommendationService::new(work_items, clock.clone())),
            recurring: Arc::new(RecurringService::new(
                obligations.clone(),
                payments.clone(),
                database.client_repository(),
                billing,
                activity.clone(),
                clock.clone(),
            )),
            payments: Arc::new(PaymentService::new(payments, obligations, activity, clock)),
            metrics,
        };

        Ok(Self {
            config,
            database,
            state,
        })
    }

    /// 运行HTTP服务直到收到关闭信号
    pub async fn run(self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        let listener = TcpListener::bind(&self.config.api.bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {}", self.config.api.bind_address))?;
        info!("API服务器启动在: {}", self.config.api.bind_address);

        let app = create_app(self.state, self.config.api.cors_enabled);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("API服务器运行失败")?;

        self.database.close().await;
        info!("API服务器已停止");
        Ok(())
    }
}

fn create_metrics_handle(config: &AppConfig) -> Option<PrometheusHandle> {
    if !config.observability.metrics_enabled {
        return None;
    }
    match install_prometheus_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("安装Prometheus指标记录器失败，/metrics 不可用: {e}");
            None
        }
    }
}

fn create_billing_gateway(config: &AppConfig) -> Result<Arc<dyn BillingGateway>> {
    if config.billing.enabled {
        let gateway =
            HttpBillingGateway::new(&config.billing).context("初始化开票服务客户端失败")?;
        info!("开票服务同步已启用: {}", config.billing.base_url);
        Ok(Arc::new(gateway))
    } else {
        info!("开票服务同步未启用，周期账单仅在本地维护");
        Ok(Arc::new(NoopBillingGateway::new()))
    }
}
