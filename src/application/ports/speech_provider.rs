//! Speech Provider Port - 云端 TTS 服务商抽象
//!
//! 每个服务商一个适配器（infrastructure/adapters/tts），
//! 服务商差异通过 `ProviderCapabilities` 暴露给上层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::voice::{Engine, LanguageCode, OutputFormat, Region, SampleRate, Voice};
use crate::domain::{Credentials, ProviderCapabilities};

/// 服务商错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// 鉴权被服务商拒绝
    CredentialInvalid,
    /// 网络不可达 / 超时
    NetworkUnavailable,
    /// 服务商侧取消合成（带原因与详情）
    Canceled,
    /// 未分类的服务商错误
    Provider,
}

/// 服务商错误
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::CredentialInvalid, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NetworkUnavailable, message)
    }

    /// 结构化的合成取消：`Speech synthesis failed: <reason> - <detail>`
    pub fn canceled(reason: &str, detail: Option<&str>) -> Self {
        let mut message = format!("Speech synthesis failed: {}", reason);
        if let Some(detail) = detail.filter(|d| !d.is_empty()) {
            message.push_str(&format!(" - {}", detail));
        }
        Self::new(ProviderErrorKind::Canceled, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Provider, message)
    }
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
    pub language: Option<LanguageCode>,
    pub region: Option<Region>,
    pub engine: Option<Engine>,
    pub format: OutputFormat,
    pub sample_rate: SampleRate,
}

/// Speech Provider Port
#[async_trait]
pub trait SpeechProviderPort: Send + Sync {
    /// 服务商能力描述
    fn capabilities(&self) -> &ProviderCapabilities;

    /// 可用区域（有序）；没有区域概念的服务商返回单个伪区域
    async fn list_regions(&self, credentials: &Credentials) -> Result<Vec<Region>, ProviderError>;

    /// 区域支持的引擎，纯静态查表；未知区域返回空集合
    fn engines_for(&self, _region: &Region) -> Vec<Engine> {
        Vec::new()
    }

    /// 校验凭据是否被服务商接受
    async fn verify_credentials(&self, credentials: &Credentials) -> Result<(), ProviderError>;

    /// 发现音色（唯一的网络往返）
    async fn discover_voices(
        &self,
        credentials: &Credentials,
        region: &Region,
        engine: Option<Engine>,
    ) -> Result<Vec<Voice>, ProviderError>;

    /// 执行一次合成，返回服务商原样的音频字节
    async fn synthesize(
        &self,
        credentials: &Credentials,
        request: &SpeechRequest,
    ) -> Result<Vec<u8>, ProviderError>;
}
