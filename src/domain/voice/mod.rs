//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 区域 / 引擎 / 格式 / 采样率等值对象
//! - 服务商无关的 Voice 与 Language 模型
//! - 下拉框显示字符串与服务商原生 ID 之间的可逆映射

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::{parse_voice_label, voice_label, Language, Voice, VoiceLabelStyle};
pub use errors::VoiceError;
pub use value_objects::{
    Engine, Gender, GenderFilter, LanguageCode, OutputFormat, Region, SampleRate,
};
