//! 外部开票服务适配器
//!
//! 本地枚举与远端数字编码的转换只在这里进行。

pub mod codes;
pub mod http_gateway;
pub mod noop_gateway;

pub use codes::{frequency_code, frequency_from_code, status_code, status_from_code};
pub use http_gateway::{HttpBillingGateway, IDEMPOTENCY_HEADER};
pub use noop_gateway::NoopBillingGateway;
