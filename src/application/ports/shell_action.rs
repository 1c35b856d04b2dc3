//! Shell Action Port - 操作系统动作
//!
//! 在文件管理器中显示文件、调用系统播放器播放音频。
//! 平台分支属于适配器细节

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("{program} exited with status {status}")]
    ExitStatus { program: String, status: String },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

/// Shell Action Port
#[async_trait]
pub trait ShellActionPort: Send + Sync {
    /// 在文件管理器中显示文件
    async fn reveal(&self, path: &Path) -> Result<(), ShellError>;

    /// 播放音频文件，返回时播放已结束
    async fn play(&self, path: &Path) -> Result<(), ShellError>;
}
