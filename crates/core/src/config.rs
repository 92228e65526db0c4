use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use bizops_errors::{BizOpsError, BizOpsResult};

use crate::logging::LogFormat;

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/bizops.toml",
    "bizops.toml",
    "/etc/bizops/config.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub billing: BillingConfig,
    pub scoring: ScoringConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    pub bind_address: String,
    pub cors_enabled: bool,
}

/// 外部开票服务
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringConfig {
    /// 批量重算时同时在途的评分数
    pub recalc_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://bizops.db?mode=rwc".to_string(),
                max_connections: 5,
            },
            api: ApiConfig {
                bind_address: "0.0.0.0:8080".to_string(),
                cors_enabled: true,
            },
            billing: BillingConfig {
                enabled: false,
                base_url: String::new(),
                api_key: String::new(),
                timeout_seconds: 10,
                max_retries: 2,
                retry_backoff_ms: 500,
            },
            scoring: ScoringConfig {
                recalc_concurrency: 8,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                log_format: LogFormat::Pretty,
                metrics_enabled: true,
            },
        }
    }
}

impl AppConfig {
    /// 默认值 → TOML 文件 → `BIZOPS_` 环境变量（层级用 `__` 分隔）
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults = AppConfig::default();
        let mut builder = ConfigBuilder::builder()
            .set_default("database.url", defaults.database.url.as_str())?
            .set_default("database.max_connections", defaults.database.max_connections as i64)?
            .set_default("api.bind_address", defaults.api.bind_address.as_str())?
            .set_default("api.cors_enabled", defaults.api.cors_enabled)?
            .set_default("billing.enabled", defaults.billing.enabled)?
            .set_default("billing.base_url", defaults.billing.base_url.as_str())?
            .set_default("billing.api_key", defaults.billing.api_key.as_str())?
            .set_default("billing.timeout_seconds", defaults.billing.timeout_seconds as i64)?
            .set_default("billing.max_retries", defaults.billing.max_retries as i64)?
            .set_default("billing.retry_backoff_ms", defaults.billing.retry_backoff_ms as i64)?
            .set_default(
                "scoring.recalc_concurrency",
                defaults.scoring.recalc_concurrency as i64,
            )?
            .set_default("observability.log_level", defaults.observability.log_level.as_str())?
            .set_default("observability.log_format", defaults.observability.log_format.as_str())?
            .set_default(
                "observability.metrics_enabled",
                defaults.observability.metrics_enabled,
            )?;

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("BIZOPS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> BizOpsResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(BizOpsError::config_error("database.url 不能为空"));
        }
        if self.database.max_connections == 0 {
            return Err(BizOpsError::config_error(
                "database.max_connections 必须大于0",
            ));
        }
        if self.api.bind_address.trim().is_empty() {
            return Err(BizOpsError::config_error("api.bind_address 不能为空"));
        }
        if self.scoring.recalc_concurrency == 0 {
            return Err(BizOpsError::config_error(
                "scoring.recalc_concurrency 必须大于0",
            ));
        }
        if self.billing.enabled {
            if self.billing.base_url.trim().is_empty() {
                return Err(BizOpsError::config_error(
                    "启用开票同步时 billing.base_url 不能为空",
                ));
            }
            if !self.billing.base_url.starts_with("http://")
                && !self.billing.base_url.starts_with("https://")
            {
                return Err(BizOpsError::config_error(
                    "billing.base_url 必须以 http:// 或 https:// 开头",
                ));
            }
        }
        if self.billing.timeout_seconds == 0 {
            return Err(BizOpsError::config_error(
                "billing.timeout_seconds 必须大于0",
            ));
        }
        Ok(())
    }
}
