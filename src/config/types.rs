//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::provider::DEFAULT_MAX_TEXT_CHARS;
use crate::infrastructure::adapters::storage::default_output_dir;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Amazon Polly 配置
    #[serde(default)]
    pub polly: PollyConfig,

    /// Azure Speech 配置
    #[serde(default)]
    pub azure: AzureConfig,

    /// 输出目录配置
    #[serde(default)]
    pub output: OutputConfig,

    /// 文本限制
    #[serde(default)]
    pub text: TextConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// Amazon Polly 配置
#[derive(Debug, Clone, Deserialize)]
pub struct PollyConfig {
    /// 区域列表加载后优先选中的区域
    #[serde(default = "default_region")]
    pub default_region: String,

    /// STS 凭据校验使用的区域
    #[serde(default = "default_region")]
    pub verify_region: String,

    /// 单次操作超时（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for PollyConfig {
    fn default() -> Self {
        Self {
            default_region: default_region(),
            verify_region: default_region(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Azure Speech 配置
#[derive(Debug, Clone, Deserialize)]
pub struct AzureConfig {
    /// HTTP 请求超时（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

/// 输出目录配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// 保存目录，未设置时使用用户下载目录
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl OutputConfig {
    /// 实际使用的保存目录
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_output_dir)
    }
}

/// 文本限制
#[derive(Debug, Clone, Deserialize)]
pub struct TextConfig {
    /// 单次合成的最大字符数
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_TEXT_CHARS
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
