use async_trait::async_trait;
use tracing::info;

use bizops_domain::{ActivityRecorder, DomainEvent, ObligationEvent};
use bizops_errors::BizOpsResult;

/// 以结构化日志的形式记录领域事件
#[derive(Debug, Default, Clone)]
pub struct TracingActivityRecorder;

impl TracingActivityRecorder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActivityRecorder for TracingActivityRecorder {
    async fn record(&self, event: &ObligationEvent) -> BizOpsResult<()> {
        let payload = serde_json::to_string(event)?;
        info!(
            event_id = %event.event_id(),
            event_type = event.event_type(),
            aggregate_id = %event.aggregate_id(),
            occurred_at = %event.occurred_at(),
            payload = %payload,
            "活动记录"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_record_never_fails_for_valid_events() {
        let recorder = TracingActivityRecorder::new();
        let event = ObligationEvent::created(1, 2, Utc::now());
        assert!(recorder.record(&event).await.is_ok());
    }
}
