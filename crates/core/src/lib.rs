pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{
    ApiConfig, AppConfig, BillingConfig, DatabaseConfig, ObservabilityConfig, ScoringConfig,
};
pub use logging::{init_logging, LogFormat, StructuredLogger};
pub use metrics::{install_prometheus_recorder, MetricsRecorder};
