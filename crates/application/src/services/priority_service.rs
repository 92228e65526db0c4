use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use bizops_core::{MetricsRecorder, StructuredLogger};
use bizops_domain::{
    compute_score, Clock, ItemKind, ItemRef, ScoreBreakdown, WorkItemRepository, PROJECT_ENTITY,
    TASK_ENTITY,
};
use bizops_errors::{BizOpsError, BizOpsResult};

/// 一次评分并落库的结果
#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    pub item: ItemRef,
    pub breakdown: ScoreBreakdown,
    pub reason: String,
    pub calculated_at: DateTime<Utc>,
}

/// 批量重算结果，单条失败不影响其他条目
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecalculationReport {
    pub succeeded: usize,
    pub failed: Vec<(ItemRef, String)>,
}

pub struct PriorityService {
    work_items: Arc<dyn WorkItemRepository>,
    clock: Arc<dyn Clock>,
    metrics: MetricsRecorder,
    recalc_concurrency: usize,
}

impl PriorityService {
    pub fn new(
        work_items: Arc<dyn WorkItemRepository>,
        clock: Arc<dyn Clock>,
        recalc_concurrency: usize,
    ) -> Self {
        Self {
            work_items,
            clock,
            metrics: MetricsRecorder::new(),
            recalc_concurrency: recalc_concurrency.max(1),
        }
    }

    /// 只计算不落库
    pub async fn compute_score(&self, owner_id: i64, item: ItemRef) -> BizOpsResult<ScoreBreakdown> {
        let snapshot = self
            .work_items
            .load_snapshot(owner_id, item)
            .await?
            .ok_or_else(|| not_found(item))?;
        Ok(compute_score(&snapshot, self.clock.now()))
    }

    #[instrument(skip(self, item), fields(item = %item))]
    pub async fn calculate_and_persist(
        &self,
        owner_id: i64,
        item: ItemRef,
    ) -> BizOpsResult<ScoredItem> {
        let breakdown = self.compute_score(owner_id, item).await?;
        let calculated_at = self.clock.now();
        self.work_items
            .persist_score(owner_id, item, breakdown.total_score, calculated_at)
            .await?;

        let reason = breakdown.reason();
        StructuredLogger::log_score_calculated(
            kind_label(item.kind),
            item.id,
            breakdown.total_score,
            &reason,
        );

        Ok(ScoredItem {
            item,
            breakdown,
            reason,
            calculated_at,
        })
    }

    /// 重算调用方所有未完成条目，并发数受 `recalc_concurrency` 限制
    #[instrument(skip(self))]
    pub async fn recalculate_all(&self, owner_id: i64) -> BizOpsResult<RecalculationReport> {
        let items = self.work_items.list_open_items(owner_id).await?;
        let total = items.len();

        let results: Vec<(ItemRef, BizOpsResult<ScoredItem>)> = stream::iter(items)
            .map(|item| async move { (item, self.calculate_and_persist(owner_id, item).await) })
            .buffer_unordered(self.recalc_concurrency)
            .collect()
            .await;

        let mut report = RecalculationReport::default();
        for (item, result) in results {
            match result {
                Ok(_) => report.succeeded += 1,
                Err(e) => {
                    warn!("重算条目 {} 失败: {}", item, e);
                    report.failed.push((item, e.to_string()));
                }
            }
        }
        report.failed.sort_by_key(|(item, _)| (item.kind, item.id));

        self.metrics
            .record_scores_recalculated(report.succeeded as u64);
        info!(
            "批量重算完成: 共 {} 条, 成功 {} 条, 失败 {} 条",
            total,
            report.succeeded,
            report.failed.len()
        );

        Ok(report)
    }
}

fn kind_label(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Task => "task",
        ItemKind::Project => "project",
    }
}

fn not_found(item: ItemRef) -> BizOpsError {
    match item.kind {
        ItemKind::Task => BizOpsError::not_found(TASK_ENTITY, item.id),
        ItemKind::Project => BizOpsError::not_found(PROJECT_ENTITY, item.id),
    }
}
