//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（voxdesk.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
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
const CONFIG_FILE_NAMES: &[&str] = &["voxdesk", "voxdesk.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VOXDESK_`，层级分隔符 `__`）
/// 2. 配置文件（voxdesk.toml 或 voxdesk.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VOXDESK_POLLY__DEFAULT_REGION=eu-west-1`
/// - `VOXDESK_AZURE__TIMEOUT_SECS=10`
/// - `VOXDESK_OUTPUT__DIR=/data/audio`
/// - `VOXDESK_LOG__JSON=true`
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
        .set_default("polly.default_region", "us-east-1")?
        .set_default("polly.verify_region", "us-east-1")?
        .set_default("polly.timeout_secs", 30)?
        .set_default("azure.timeout_secs", 30)?
        .set_default("text.max_chars", 3000)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级），例如 VOXDESK_POLLY__VERIFY_REGION=us-west-2
    builder = builder.add_source(
        Environment::with_prefix("VOXDESK")
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
    if config.polly.default_region.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Polly default region cannot be empty".to_string(),
        ));
    }

    if config.polly.verify_region.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Polly verify region cannot be empty".to_string(),
        ));
    }

    if config.polly.timeout_secs == 0 || config.azure.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Provider timeout cannot be 0".to_string(),
        ));
    }

    if config.text.max_chars == 0 {
        return Err(ConfigError::ValidationError(
            "Text character limit cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Polly Default Region: {}", config.polly.default_region);
    tracing::info!("Polly Verify Region: {}", config.polly.verify_region);
    tracing::info!("Polly Timeout: {}s", config.polly.timeout_secs);
    tracing::info!("Azure Timeout: {}s", config.azure.timeout_secs);
    tracing::info!("Output Directory: {:?}", config.output.resolved_dir());
    tracing::info!("Max Text Chars: {}", config.text.max_chars);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
