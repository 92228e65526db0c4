use async_trait::async_trait;

use bizops_domain::{BillingGateway, Frequency, RetainerDocument, RetainerSpec, RetainerUpdate};
use bizops_errors::BizOpsResult;

/// 未启用开票服务时使用：不发起任何远端调用，也不产生远端 ID
#[derive(Debug, Default, Clone)]
pub struct NoopBillingGateway;

impl NoopBillingGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BillingGateway for NoopBillingGateway {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn supports_frequency(&self, _frequency: Frequency) -> bool {
        true
    }

    async fn create_retainer(&self, _spec: &RetainerSpec) -> BizOpsResult<Option<String>> {
        Ok(None)
    }

    async fn update_retainer(&self, _retainer_id: &str, _update: &RetainerUpdate) -> BizOpsResult<()> {
        Ok(())
    }

    async fn retainer_documents(&self, _retainer_id: &str) -> BizOpsResult<Vec<RetainerDocument>> {
        Ok(Vec::new())
    }
}
