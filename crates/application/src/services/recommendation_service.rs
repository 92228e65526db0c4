use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, instrument};

use bizops_domain::{Clock, PriorityCandidate, RankedItem, WorkItemRepository};
use bizops_errors::BizOpsResult;

/// "今日待办"从排名前几的条目中筛选
pub const TODAY_CANDIDATES: usize = 5;
pub const TODAY_MIN_SCORE: u8 = 50;

/// 基于已存储分数的排序与推荐，不会重新计算分数
pub struct RecommendationService {
    work_items: Arc<dyn WorkItemRepository>,
    clock: Arc<dyn Clock>,
}

/// 分数降序，其后按创建时间、类型（任务在前）、ID 升序
fn ranking_order(a: &PriorityCandidate, b: &PriorityCandidate) -> Ordering {
    b.priority_score
        .cmp(&a.priority_score)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.item.kind.cmp(&b.item.kind))
        .then(a.item.id.cmp(&b.item.id))
}

impl RecommendationService {
    pub fn new(work_items: Arc<dyn WorkItemRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { work_items, clock }
    }

    /// 任务与项目各取前 ceil(n/2) 条，合并后重新排序并截断到 n
    #[instrument(skip(self))]
    pub async fn top_priority_items(&self, owner_id: i64, n: usize) -> BizOpsResult<Vec<RankedItem>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let per_kind = n.div_ceil(2);

        let mut candidates = self.work_items.top_open_tasks(owner_id, per_kind).await?;
        candidates.extend(self.work_items.top_open_projects(owner_id, per_kind).await?);
        candidates.sort_by(ranking_order);
        candidates.truncate(n);

        debug!("返回 {} 条优先条目", candidates.len());
        Ok(candidates.into_iter().map(RankedItem::from).collect())
    }

    /// 前 5 条中保留 分数 ≥ 50 或截止日期不晚于今天 的条目，保持原有顺序
    #[instrument(skip(self))]
    pub async fn recommended_for_today(&self, owner_id: i64) -> BizOpsResult<Vec<RankedItem>> {
        let today = self.clock.today();
        let ranked = self.top_priority_items(owner_id, TODAY_CANDIDATES).await?;

        Ok(ranked
            .into_iter()
            .filter(|item| {
                item.score >= TODAY_MIN_SCORE
                    || item
                        .deadline
                        .map(|deadline| deadline.date_naive() <= today)
                        .unwrap_or(false)
            })
            .collect())
    }
}
