//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SpeechProvider、SecretStore、AudioStorage、Shell 等）
//! - catalog: 音色目录与发现
//! - selection: 级联选择状态机
//! - synthesis: 合成编排
//! - credentials: 凭据生命周期
//! - session: 单个服务商的完整流程
//! - error: 应用层错误定义

pub mod catalog;
pub mod credentials;
pub mod error;
pub mod ports;
pub mod selection;
pub mod session;
pub mod synthesis;

// Re-exports
pub use catalog::{CatalogLookup, CatalogResolver, CatalogScope, VoiceCatalog};
pub use credentials::{CredentialManager, SaveOutcome};
pub use error::{ApplicationError, ErrorKind};
pub use selection::{SelectionDiff, SelectionError, SelectionMachine, SelectionOptions};
pub use session::{Notice, ProviderSession, Route, SavedAudio, SessionPorts, Severity};
pub use synthesis::{CharCount, SynthesisOrchestrator, SynthesisResult, SynthesizedAudio};

pub use ports::{
    AudioInfo, AudioStorageError, AudioStoragePort, AudioTranscoderPort, ProviderError,
    ProviderErrorKind, SecretStoreError, SecretStorePort, ShellActionPort, ShellError,
    SpeechProviderPort, SpeechRequest, TranscodeError,
};
