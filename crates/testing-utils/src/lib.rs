//! # BizOps Testing Utils
//!
//! 工作区共享的测试工具：
//!
//! - **Mock 仓储**：`MockStore` 在内存中实现全部仓储 trait，多行写入保持原子性
//! - **外部服务替身**：`RecordingBillingGateway` / `RecordingActivityRecorder`，可注入失败
//! - **测试数据构建器**：带合理默认值的实体构建器
//!
//! ```rust,ignore
//! use bizops_testing_utils::{MockStore, RecordingBillingGateway, TaskBuilder};
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
