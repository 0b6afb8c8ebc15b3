//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use reqwest::Url;
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `MUSEGEN_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `MUSEGEN_API__PAGE_ORIGIN=https://music.example.com`
/// - `MUSEGEN_API__BACKEND_PORT=8000`
/// - `MUSEGEN_POLL__INTERVAL_MS=2000`
/// - `MUSEGEN_LOG__LEVEL=debug`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("api.page_origin", "http://localhost:3000")?
        .set_default("api.dev_port", 3000)?
        .set_default("api.backend_port", 8000)?
        .set_default("api.prefix", "/api")?
        .set_default("api.timeout_secs", 30)?
        .set_default("poll.interval_ms", 2000)?
        .set_default("playback.channel_capacity", 64)?
        .set_default("history.page_size", 15)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: MUSEGEN_API__PAGE_ORIGIN=http://localhost:3000
    builder = builder.add_source(
        Environment::with_prefix("MUSEGEN")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.api.page_origin.is_empty() {
        return Err(ConfigError::ValidationError(
            "Page origin cannot be empty".to_string(),
        ));
    }

    if Url::parse(&config.api.page_origin).is_err() {
        return Err(ConfigError::ValidationError(format!(
            "Page origin is not a valid URL: {}",
            config.api.page_origin
        )));
    }

    if config.api.backend_port == 0 {
        return Err(ConfigError::ValidationError(
            "Backend port cannot be 0".to_string(),
        ));
    }

    if !config.api.prefix.is_empty() && !config.api.prefix.starts_with('/') {
        return Err(ConfigError::ValidationError(format!(
            "API prefix must start with '/': {}",
            config.api.prefix
        )));
    }

    if config.poll.interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Poll interval cannot be 0".to_string(),
        ));
    }

    if config.playback.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "Playback channel capacity cannot be 0".to_string(),
        ));
    }

    if config.history.page_size == 0 || config.history.page_size > 100 {
        return Err(ConfigError::ValidationError(
            "History page size must be between 1 and 100".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Page Origin: {}", config.api.page_origin);
    tracing::info!(
        "Dev Port: {} -> Backend Port: {}",
        config.api.dev_port,
        config.api.backend_port
    );
    tracing::info!("API Prefix: {}", config.api.prefix);
    tracing::info!("Request Timeout: {}s", config.api.timeout_secs);
    tracing::info!("Poll Interval: {}ms", config.poll.interval_ms);
    tracing::info!(
        "Playback Channel Capacity: {}",
        config.playback.channel_capacity
    );
    tracing::info!("History Page Size: {}", config.history.page_size);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
