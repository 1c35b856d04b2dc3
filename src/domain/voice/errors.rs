//! Voice Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Invalid region: {0:?}")]
    InvalidRegion(String),

    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    #[error("Unknown output format: {0}")]
    UnknownFormat(String),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(String),

    #[error("Unknown gender: {0}")]
    UnknownGender(String),

    #[error("Invalid language code: {0:?}")]
    InvalidLanguage(String),

    #[error("Invalid voice: {0}")]
    InvalidVoice(String),
}
