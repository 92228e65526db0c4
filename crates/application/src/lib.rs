//! 用例层：评分、推荐、周期账单调度与付款状态流转

pub mod services;

pub use services::*;
