//! Provider Context - 服务商能力描述
//!
//! 两个服务商共用一套选择/合成流程，差异全部收敛在 `ProviderCapabilities` 里：
//! - provider A (Amazon Polly): 多区域、多引擎、静态格式表
//! - provider B (Azure Speech): 单 endpoint、无引擎、订阅密钥鉴权

use serde::{Deserialize, Serialize};

use super::voice::{Engine, OutputFormat, SampleRate, VoiceLabelStyle};

/// 服务商
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Polly,
    Azure,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Polly => "polly",
            Self::Azure => "azure",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Polly => "Amazon Polly",
            Self::Azure => "Azure Speech",
        }
    }

    /// 密钥存储的服务命名空间
    pub fn secret_service(&self) -> &'static str {
        match self {
            Self::Polly => "aws_tts_app",
            Self::Azure => "azure_tts_app",
        }
    }

    /// 密钥存储中的两个键名（主字段、副字段）
    pub fn secret_keys(&self) -> [&'static str; 2] {
        match self {
            Self::Polly => ["access_key_id", "secret_access_key"],
            Self::Azure => ["subscription_key", "endpoint"],
        }
    }

    /// 凭据字段的人类可读名称
    pub fn credential_labels(&self) -> [&'static str; 2] {
        match self {
            Self::Polly => ["Access Key", "Secret Key"],
            Self::Azure => ["Subscription Key", "Endpoint"],
        }
    }

    /// 输出文件名前缀
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Self::Polly => "polly_tts",
            Self::Azure => "azure_tts",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 音色发现调用的形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryShape {
    /// 每个 (区域, 引擎) 单独发现
    PerRegionEngine,
    /// 无参数，一次返回全部音色
    Global,
}

const POLLY_FORMATS: &[OutputFormat] = &[OutputFormat::Mp3, OutputFormat::OggVorbis, OutputFormat::Pcm];
const AZURE_FORMATS: &[OutputFormat] = &[OutputFormat::Wav, OutputFormat::Mp3, OutputFormat::OggOpus];

const POLLY_COMPRESSED_RATES: &[SampleRate] = &[
    SampleRate::new(8000),
    SampleRate::new(16000),
    SampleRate::new(22050),
    SampleRate::new(24000),
];
const POLLY_PCM_RATES: &[SampleRate] = &[SampleRate::new(8000), SampleRate::new(16000)];
const AZURE_RATES: &[SampleRate] = &[
    SampleRate::new(16000),
    SampleRate::new(24000),
    SampleRate::new(48000),
];

/// 默认字符上限
pub const DEFAULT_MAX_TEXT_CHARS: usize = 3000;

/// 服务商能力描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub kind: ProviderKind,
    pub has_regions: bool,
    pub has_engines: bool,
    /// 目录是否支持按性别过滤
    pub gender_filter: bool,
    pub discovery: DiscoveryShape,
    pub label_style: VoiceLabelStyle,
    pub max_text_chars: Option<usize>,
}

impl ProviderCapabilities {
    pub fn polly() -> Self {
        Self {
            kind: ProviderKind::Polly,
            has_regions: true,
            has_engines: true,
            gender_filter: true,
            discovery: DiscoveryShape::PerRegionEngine,
            label_style: VoiceLabelStyle::IdWithGender,
            max_text_chars: Some(DEFAULT_MAX_TEXT_CHARS),
        }
    }

    pub fn azure() -> Self {
        Self {
            kind: ProviderKind::Azure,
            has_regions: false,
            has_engines: false,
            gender_filter: true,
            discovery: DiscoveryShape::Global,
            label_style: VoiceLabelStyle::ShortNameWithLocalName,
            max_text_chars: Some(DEFAULT_MAX_TEXT_CHARS),
        }
    }

    pub fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Polly => Self::polly(),
            ProviderKind::Azure => Self::azure(),
        }
    }

    pub fn with_max_text_chars(mut self, limit: Option<usize>) -> Self {
        self.max_text_chars = limit;
        self
    }

    /// 静态输出格式表
    pub fn formats(&self) -> &'static [OutputFormat] {
        match self.kind {
            ProviderKind::Polly => POLLY_FORMATS,
            ProviderKind::Azure => AZURE_FORMATS,
        }
    }

    /// 引擎切换后默认选中的格式
    pub fn default_format(&self) -> OutputFormat {
        match self.kind {
            ProviderKind::Polly => OutputFormat::Mp3,
            ProviderKind::Azure => OutputFormat::Wav,
        }
    }

    /// 某个输出格式的合法采样率集合，格式不被支持时为空
    pub fn sample_rates(&self, format: OutputFormat) -> &'static [SampleRate] {
        match (self.kind, format) {
            (ProviderKind::Polly, OutputFormat::Mp3 | OutputFormat::OggVorbis) => {
                POLLY_COMPRESSED_RATES
            }
            (ProviderKind::Polly, OutputFormat::Pcm) => POLLY_PCM_RATES,
            (ProviderKind::Azure, OutputFormat::Wav | OutputFormat::Mp3 | OutputFormat::OggOpus) => {
                AZURE_RATES
            }
            _ => &[],
        }
    }

    /// 默认采样率：raw-pcm → 16000；standard 引擎 → 22050；其他 → 24000
    ///
    /// 默认值不在合法集合中时退回集合的第一个值
    pub fn default_sample_rate(
        &self,
        format: OutputFormat,
        engine: Option<Engine>,
    ) -> Option<SampleRate> {
        let preferred = if format.is_raw_pcm() {
            SampleRate::new(16000)
        } else if engine == Some(Engine::Standard) {
            SampleRate::new(22050)
        } else {
            SampleRate::new(24000)
        };
        let legal = self.sample_rates(format);
        if legal.contains(&preferred) {
            Some(preferred)
        } else {
            legal.first().copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polly_sample_rate_defaults() {
        let caps = ProviderCapabilities::polly();
        assert_eq!(
            caps.default_sample_rate(OutputFormat::Pcm, Some(Engine::Neural)),
            Some(SampleRate::new(16000))
        );
        assert_eq!(
            caps.default_sample_rate(OutputFormat::Mp3, Some(Engine::Standard)),
            Some(SampleRate::new(22050))
        );
        assert_eq!(
            caps.default_sample_rate(OutputFormat::OggVorbis, Some(Engine::Generative)),
            Some(SampleRate::new(24000))
        );
    }

    #[test]
    fn test_azure_sample_rate_defaults() {
        let caps = ProviderCapabilities::azure();
        assert_eq!(
            caps.default_sample_rate(OutputFormat::Wav, None),
            Some(SampleRate::new(24000))
        );
        assert!(caps.sample_rates(OutputFormat::Pcm).is_empty());
        assert_eq!(caps.default_sample_rate(OutputFormat::Pcm, None), None);
    }

    #[test]
    fn test_polly_pcm_rates() {
        let caps = ProviderCapabilities::polly();
        let rates: Vec<u32> = caps
            .sample_rates(OutputFormat::Pcm)
            .iter()
            .map(|r| r.hz())
            .collect();
        assert_eq!(rates, vec![8000, 16000]);
    }

    #[test]
    fn test_secret_namespaces_are_distinct() {
        assert_ne!(
            ProviderKind::Polly.secret_service(),
            ProviderKind::Azure.secret_service()
        );
        assert_eq!(ProviderKind::Azure.secret_keys(), ["subscription_key", "endpoint"]);
    }
}
