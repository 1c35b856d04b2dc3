//! Voice Context - Value Objects

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::VoiceError;

/// 区域标识（如 "us-east-1"）
///
/// 对于没有区域概念的服务商，使用 endpoint 作为伪区域
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Region(String);

impl Region {
    pub fn new(region: impl Into<String>) -> Result<Self, VoiceError> {
        let region = region.into();
        let trimmed = region.trim();
        if trimmed.is_empty() {
            return Err(VoiceError::InvalidRegion(region));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 合成引擎（质量档位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    Standard,
    Neural,
    LongForm,
    Generative,
}

impl Engine {
    /// 全部引擎，按静态表顺序
    pub const ALL: [Engine; 4] = [
        Engine::Standard,
        Engine::Neural,
        Engine::LongForm,
        Engine::Generative,
    ];

    /// 区域切换后自动选择引擎时的优先顺序
    pub const PREFERENCE: [Engine; 4] = [
        Engine::Neural,
        Engine::Generative,
        Engine::LongForm,
        Engine::Standard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Neural => "neural",
            Self::LongForm => "long-form",
            Self::Generative => "generative",
        }
    }

    /// 从候选集合中按优先顺序选出最佳引擎
    pub fn preferred(available: &[Engine]) -> Option<Engine> {
        Self::PREFERENCE
            .iter()
            .copied()
            .find(|engine| available.contains(engine))
            .or_else(|| available.first().copied())
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Engine {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "neural" => Ok(Self::Neural),
            "long-form" | "longform" | "long_form" => Ok(Self::LongForm),
            "generative" => Ok(Self::Generative),
            _ => Err(VoiceError::UnknownEngine(s.to_string())),
        }
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Mp3,
    OggVorbis,
    OggOpus,
    /// 原始 16 位单声道 PCM，播放前需要封装 WAV 头
    Pcm,
    /// RIFF/WAV 容器
    Wav,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg_vorbis",
            Self::OggOpus => "ogg_opus",
            Self::Pcm => "pcm",
            Self::Wav => "wav",
        }
    }

    /// 落盘时使用的扩展名
    ///
    /// PCM 总是被封装成 WAV，所以扩展名是 wav
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis | Self::OggOpus => "ogg",
            Self::Pcm | Self::Wav => "wav",
        }
    }

    pub fn is_raw_pcm(&self) -> bool {
        matches!(self, Self::Pcm)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "ogg_vorbis" | "ogg-vorbis" | "vorbis" => Ok(Self::OggVorbis),
            "ogg_opus" | "ogg-opus" | "opus" => Ok(Self::OggOpus),
            "pcm" | "raw-pcm" | "raw_pcm" => Ok(Self::Pcm),
            "wav" | "riff" => Ok(Self::Wav),
            _ => Err(VoiceError::UnknownFormat(s.to_string())),
        }
    }
}

/// 采样率（Hz）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SampleRate(u32);

impl SampleRate {
    pub const fn new(hz: u32) -> Self {
        Self(hz)
    }

    pub fn hz(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleRate {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .filter(|hz| *hz > 0)
            .map(Self)
            .ok_or_else(|| VoiceError::InvalidSampleRate(s.to_string()))
    }
}

/// 音色性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Neutral,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
            Self::Neutral => "Neutral",
        }
    }

    /// 宽松解析服务商返回的性别字段，未知值返回 None
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Gender {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "female" => Ok(Self::Female),
            "male" => Ok(Self::Male),
            "neutral" => Ok(Self::Neutral),
            _ => Err(VoiceError::UnknownGender(s.to_string())),
        }
    }
}

/// 性别过滤器，默认 "All"（不过滤）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GenderFilter {
    #[default]
    All,
    Only(Gender),
}

impl GenderFilter {
    pub const ALL_LABEL: &'static str = "All";

    pub fn matches(&self, gender: Option<Gender>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => gender == Some(*wanted),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => Self::ALL_LABEL,
            Self::Only(gender) => gender.as_str(),
        }
    }
}

impl std::fmt::Display for GenderFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for GenderFilter {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(Self::ALL_LABEL) {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

/// 语言代码（如 "en-US"）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Result<Self, VoiceError> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
            return Err(VoiceError::InvalidLanguage(code));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// 解析语言下拉框的显示字符串 "English, US (en-US)"，也接受裸代码 "en-US"
    pub fn from_display(display: &str) -> Result<Self, VoiceError> {
        let display = display.trim();
        match display.rsplit_once('(') {
            Some((_, tail)) if display.ends_with(')') => Self::new(tail.trim_end_matches(')')),
            _ => Self::new(display),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
