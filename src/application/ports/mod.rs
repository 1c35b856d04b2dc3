//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_storage;
mod audio_transcoder;
mod secret_store;
mod shell_action;
mod speech_provider;

pub use audio_storage::{AudioStorageError, AudioStoragePort};
pub use audio_transcoder::{AudioInfo, AudioTranscoderPort, TranscodeError};
pub use secret_store::{SecretStoreError, SecretStorePort};
pub use shell_action::{ShellActionPort, ShellError};
pub use speech_provider::{
    ProviderError, ProviderErrorKind, SpeechProviderPort, SpeechRequest,
};
