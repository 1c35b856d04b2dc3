//! 应用层错误定义
//!
//! 所有服务商/网络错误都在组件边界转换为 `ApplicationError`，
//! Shell 只会看到带标签的结果，不会看到未捕获的异常

use thiserror::Error;

use crate::application::ports::{
    AudioStorageError, ProviderError, ProviderErrorKind, SecretStoreError, ShellError,
};

/// 错误种类标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CredentialMissing,
    CredentialInvalid,
    NetworkUnavailable,
    CatalogEmpty,
    ValidationFailed,
    SynthesisFailed,
    StorageFailed,
    PlaybackFailed,
    Provider,
    Config,
}

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 缺少凭据
    #[error("{0}")]
    CredentialMissing(String),

    /// 服务商拒绝凭据
    #[error("{0}")]
    CredentialInvalid(String),

    /// 网络不可用
    #[error("{0}")]
    NetworkUnavailable(String),

    /// 当前选择下没有可用的引擎/语言/音色
    #[error("{0}")]
    CatalogEmpty(String),

    /// 输入校验失败（空文本、缺少选择字段等）
    #[error("{0}")]
    ValidationFailed(String),

    /// 服务商侧取消合成
    #[error("{0}")]
    SynthesisFailed(String),

    /// 密钥存储或输出目录读写失败
    #[error("{0}")]
    StorageFailed(String),

    /// 临时文件或播放器调用失败
    #[error("{0}")]
    PlaybackFailed(String),

    /// 未分类的服务商错误
    #[error("provider error: {0}")]
    Provider(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 凭据验证或合成流程中的失败，种类不变但必须弹窗
    #[error(transparent)]
    Blocking(Box<ApplicationError>),
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CredentialMissing(_) => ErrorKind::CredentialMissing,
            Self::CredentialInvalid(_) => ErrorKind::CredentialInvalid,
            Self::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
            Self::CatalogEmpty(_) => ErrorKind::CatalogEmpty,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::SynthesisFailed(_) => ErrorKind::SynthesisFailed,
            Self::StorageFailed(_) => ErrorKind::StorageFailed,
            Self::PlaybackFailed(_) => ErrorKind::PlaybackFailed,
            Self::Provider(_) => ErrorKind::Provider,
            Self::Config(_) => ErrorKind::Config,
            Self::Blocking(inner) => inner.kind(),
        }
    }

    /// 是否需要阻塞式弹窗（凭据与合成失败）
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Blocking(_))
            || matches!(
                self.kind(),
                ErrorKind::CredentialMissing
                    | ErrorKind::CredentialInvalid
                    | ErrorKind::SynthesisFailed
            )
    }

    /// 标记为阻塞式失败，保留原始种类与消息
    pub fn blocking(self) -> Self {
        match self {
            Self::Blocking(_) => self,
            other => Self::Blocking(Box::new(other)),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    /// 创建目录为空错误
    pub fn catalog_empty(message: impl Into<String>) -> Self {
        Self::CatalogEmpty(message.into())
    }

    /// 合成阶段的服务商错误：未分类错误也算合成失败，任何种类都需要弹窗
    pub fn from_synthesis(err: ProviderError) -> Self {
        let err = match err.kind {
            ProviderErrorKind::Provider => Self::SynthesisFailed(err.message),
            _ => err.into(),
        };
        err.blocking()
    }
}

impl From<ProviderError> for ApplicationError {
    fn from(err: ProviderError) -> Self {
        match err.kind {
            ProviderErrorKind::CredentialInvalid => Self::CredentialInvalid(err.message),
            ProviderErrorKind::NetworkUnavailable => Self::NetworkUnavailable(err.message),
            ProviderErrorKind::Canceled => Self::SynthesisFailed(err.message),
            ProviderErrorKind::Provider => Self::Provider(err.message),
        }
    }
}

impl From<SecretStoreError> for ApplicationError {
    fn from(err: SecretStoreError) -> Self {
        Self::StorageFailed(err.to_string())
    }
}

impl From<AudioStorageError> for ApplicationError {
    fn from(err: AudioStorageError) -> Self {
        Self::StorageFailed(err.to_string())
    }
}

impl From<ShellError> for ApplicationError {
    fn from(err: ShellError) -> Self {
        Self::PlaybackFailed(err.to_string())
    }
}
