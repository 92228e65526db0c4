//! 外部调用的超时与重试
//!
//! 每次尝试都在 `tokio::time::timeout` 下执行。超时与可重试错误按线性退避重试，
//! 永久性错误立即返回。

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{error, warn};

use bizops_core::BillingConfig;
use bizops_errors::{BizOpsError, BizOpsResult};

/// 单次尝试的失败分类
#[derive(Debug)]
pub enum AttemptError {
    /// 传输错误 / 5xx，可以重试
    Transient(BizOpsError),
    /// 4xx 等，重试也不会成功
    Permanent(BizOpsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl From<&BillingConfig> for RetryPolicy {
    fn from(config: &BillingConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_seconds),
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// 第 n 次重试前等待 n * backoff
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff * retry
    }

    pub async fn execute<F, Fut, T>(&self, operation_name: &'static str, mut attempt: F) -> BizOpsResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut retries = 0;
        loop {
            let outcome = match timeout(self.timeout, attempt()).await {
                Ok(result) => result,
                Err(_) => Err(AttemptError::Transient(BizOpsError::timeout_error(format!(
                    "{operation_name} 超时 ({}ms)",
                    self.timeout.as_millis()
                )))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(AttemptError::Permanent(e)) => {
                    error!("{} 失败，不再重试: {}", operation_name, e);
                    return Err(e);
                }
                Err(AttemptError::Transient(e)) if retries < self.max_retries => {
                    retries += 1;
                    let delay = self.delay_for(retries);
                    warn!(
                        "{} 第 {} 次重试，{}ms 后执行: {}",
                        operation_name,
                        retries,
                        delay.as_millis(),
                        e
                    );
                    sleep(delay).await;
                }
                Err(AttemptError::Transient(e)) => {
                    error!("{} 重试 {} 次后仍失败: {}", operation_name, retries, e);
                    return Err(e);
                }
            }
        }
    }
}
