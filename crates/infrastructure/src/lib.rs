pub mod activity;
pub mod billing;
pub mod database;
pub mod timeout_handler;

pub use activity::TracingActivityRecorder;
pub use billing::{HttpBillingGateway, NoopBillingGateway, IDEMPOTENCY_HEADER};
pub use database::*;
pub use timeout_handler::{AttemptError, RetryPolicy};
