//! 业务领域层：实体、值对象、纯计算规则与端口定义。
//! 不依赖任何具体存储或网络实现。

pub mod billing;
pub mod calendar;
pub mod clock;
pub mod entities;
pub mod events;
pub mod repositories;
pub mod scoring;
pub mod value_objects;

// SQLx 实现（仅在启用 sqlx-support feature 时编译）
#[cfg(feature = "sqlx-support")]
pub mod sqlx_impls;

pub use billing::*;
pub use clock::{Clock, FixedClock, SystemClock};
pub use entities::*;
pub use events::*;
pub use repositories::*;
pub use scoring::{compute_score, PriorityReason, ScoreBreakdown};
pub use value_objects::*;

pub use bizops_errors::{BizOpsError, BizOpsResult};
