use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use bizops_core::BillingConfig;
use bizops_domain::{
    BillingGateway, Frequency, ObligationStatus, RetainerDocument, RetainerSpec, RetainerUpdate,
};
use bizops_errors::{BizOpsError, BizOpsResult};

use super::codes::{frequency_code, status_code};
use crate::timeout_handler::{AttemptError, RetryPolicy};

/// 同一次创建的所有尝试携带相同的键，远端据此去重
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Serialize)]
struct RetainerPayload<'a> {
    client_id: i64,
    name: &'a str,
    amount: Decimal,
    frequency: u8,
    start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
    status: u8,
}

/// 只发送变更的字段
#[derive(Debug, Default, Serialize)]
struct RetainerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct CreatedRetainer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DocumentPayload {
    id: String,
    #[serde(default)]
    number: Option<String>,
    issued_on: NaiveDate,
    amount: Decimal,
    #[serde(default)]
    url: Option<String>,
}

impl From<DocumentPayload> for RetainerDocument {
    fn from(payload: DocumentPayload) -> Self {
        Self {
            id: payload.id,
            number: payload.number,
            issued_on: payload.issued_on,
            amount: payload.amount,
            url: payload.url,
        }
    }
}

fn remote_frequency(operation: &'static str, frequency: Frequency) -> BizOpsResult<u8> {
    frequency_code(frequency).ok_or_else(|| {
        BizOpsError::validation_error(format!("[{operation}] 开票服务没有频率 {frequency} 的编码"))
    })
}

/// 传输错误与 5xx 可重试，其余非 2xx 立即失败
async fn classify(
    operation: &'static str,
    sent: reqwest::Result<Response>,
) -> Result<Response, AttemptError> {
    let response = sent.map_err(|e| {
        AttemptError::Transient(BizOpsError::external_sync(operation, e.to_string()))
    })?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let error = BizOpsError::external_sync(operation, format!("HTTP {status}: {body}"));
    if status.is_server_error() {
        Err(AttemptError::Transient(error))
    } else {
        Err(AttemptError::Permanent(error))
    }
}

/// 通过 REST 接口同步 retainer
pub struct HttpBillingGateway {
    client: Client,
    base_url: String,
    api_key: String,
    policy: RetryPolicy,
}

impl HttpBillingGateway {
    pub fn new(config: &BillingConfig) -> BizOpsResult<Self> {
        Self::with_policy(&config.base_url, &config.api_key, RetryPolicy::from(config))
    }

    pub fn with_policy(base_url: &str, api_key: &str, policy: RetryPolicy) -> BizOpsResult<Self> {
        if base_url.trim().is_empty() {
            return Err(BizOpsError::config_error("开票服务 base_url 不能为空"));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| BizOpsError::config_error(format!("创建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            policy,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        operation: &'static str,
        build: impl Fn() -> RequestBuilder,
    ) -> BizOpsResult<Response> {
        self.policy
            .execute(operation, || {
                let request = build().bearer_auth(&self.api_key);
                async move { classify(operation, request.send().await).await }
            })
            .await
    }
}

#[async_trait]
impl BillingGateway for HttpBillingGateway {
    fn name(&self) -> &'static str {
        "http"
    }

    fn supports_frequency(&self, frequency: Frequency) -> bool {
        frequency_code(frequency).is_some()
    }

    #[instrument(skip(self, spec), fields(client_id = spec.client_id))]
    async fn create_retainer(&self, spec: &RetainerSpec) -> BizOpsResult<Option<String>> {
        const OPERATION: &str = "create_retainer";
        let payload = RetainerPayload {
            client_id: spec.client_id,
            name: &spec.name,
            amount: spec.amount,
            frequency: remote_frequency(OPERATION, spec.frequency)?,
            start_date: spec.start_date,
            end_date: spec.end_date,
            status: status_code(ObligationStatus::Active),
        };
        let url = self.url("/retainers");
        let idempotency_key = Uuid::new_v4().to_string();

        let response = self
            .send(OPERATION, || {
                self.client
                    .post(&url)
                    .header(IDEMPOTENCY_HEADER, &idempotency_key)
                    .json(&payload)
            })
            .await?;
        let created: CreatedRetainer = response
            .json()
            .await
            .map_err(|e| BizOpsError::external_sync(OPERATION, format!("响应解析失败: {e}")))?;

        debug!("远端 retainer 已创建: {}", created.id);
        Ok(Some(created.id))
    }

    #[instrument(skip(self, update))]
    async fn update_retainer(&self, retainer_id: &str, update: &RetainerUpdate) -> BizOpsResult<()> {
        const OPERATION: &str = "update_retainer";
        let patch = RetainerPatch {
            amount: update.amount,
            frequency: update
                .frequency
                .map(|f| remote_frequency(OPERATION, f))
                .transpose()?,
            end_date: update.end_date,
            status: update.status.map(status_code),
        };
        let url = self.url(&format!("/retainers/{retainer_id}"));

        self.send(OPERATION, || self.client.put(&url).json(&patch))
            .await?;
        debug!("远端 retainer {} 已更新", retainer_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn retainer_documents(&self, retainer_id: &str) -> BizOpsResult<Vec<RetainerDocument>> {
        const OPERATION: &str = "retainer_documents";
        let url = self.url(&format!("/retainers/{retainer_id}/documents"));

        let response = self.send(OPERATION, || self.client.get(&url)).await?;
        let documents: Vec<DocumentPayload> = response
            .json()
            .await
            .map_err(|e| BizOpsError::external_sync(OPERATION, format!("响应解析失败: {e}")))?;

        Ok(documents.into_iter().map(RetainerDocument::from).collect())
    }
}
