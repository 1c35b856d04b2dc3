//! Audio Storage Port - 出站端口
//!
//! 合成结果落盘（输出目录）与临时播放文件

use async_trait::async_trait;
use std::path::PathBuf;
use tempfile::TempPath;
use thiserror::Error;

use crate::domain::voice::OutputFormat;
use crate::domain::ProviderKind;

/// 音频存储错误
#[derive(Debug, Error)]
pub enum AudioStorageError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Invalid output directory: {0}")]
    InvalidDirectory(String),
}

/// Audio Storage Port
#[async_trait]
pub trait AudioStoragePort: Send + Sync {
    /// 输出目录
    fn output_dir(&self) -> PathBuf;

    /// 保存合成结果，文件名由服务商 + 音色 + 时间戳（秒级）确定；
    /// 目录不存在时自动创建
    async fn save_audio(
        &self,
        provider: ProviderKind,
        voice_id: &str,
        format: OutputFormat,
        data: &[u8],
    ) -> Result<PathBuf, AudioStorageError>;

    /// 写入临时文件用于直接播放，返回的 `TempPath` 在 drop 时删除文件
    async fn write_temp(
        &self,
        format: OutputFormat,
        data: &[u8],
    ) -> Result<TempPath, AudioStorageError>;
}
