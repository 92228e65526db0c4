use anyhow::Result;
use metrics::{counter, Counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// 安装全局 Prometheus recorder，返回的 handle 用于 `/metrics` 渲染
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;

    info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// 业务计数器。未安装 recorder 时所有操作均为空操作。
#[derive(Clone)]
pub struct MetricsRecorder {
    obligations_advanced_total: Counter,
    scores_recalculated_total: Counter,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            obligations_advanced_total: counter!("bizops_obligations_advanced_total"),
            scores_recalculated_total: counter!("bizops_scores_recalculated_total"),
        }
    }

    pub fn record_obligation_advanced(&self) {
        self.obligations_advanced_total.increment(1);
    }

    pub fn record_scores_recalculated(&self, count: u64) {
        self.scores_recalculated_total.increment(count);
    }

    pub fn record_billing_sync_failure(&self, operation: &'static str) {
        counter!("bizops_billing_sync_failures_total", "operation" => operation).increment(1);
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRecorder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_is_noop_without_exporter() {
        let recorder = MetricsRecorder::new();
        recorder.record_obligation_advanced();
        recorder.record_scores_recalculated(3);
        recorder.record_billing_sync_failure("create_retainer");
    }
}
