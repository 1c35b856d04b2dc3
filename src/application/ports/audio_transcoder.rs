//! Audio Transcoder Port - 音频容器处理抽象
//!
//! 服务商返回的原始 PCM 无法被通用播放器直接播放，
//! 需要由编排层封装成 WAV 容器

use thiserror::Error;

use crate::domain::voice::SampleRate;

/// 转码错误
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// 音频信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInfo {
    /// 时长（毫秒）
    pub duration_ms: u64,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channels: u16,
    /// 位深
    pub bits_per_sample: u16,
    /// data chunk 大小（字节）
    pub data_size: usize,
}

/// Audio Transcoder Port
pub trait AudioTranscoderPort: Send + Sync {
    /// 把 16 位小端单声道 PCM 封装成标准 44 字节头的 WAV
    fn wrap_pcm(&self, pcm: &[u8], sample_rate: SampleRate) -> Vec<u8>;

    /// 解析 WAV 头，获取音频信息
    fn get_audio_info(&self, wav_data: &[u8]) -> Result<AudioInfo, TranscodeError>;
}
