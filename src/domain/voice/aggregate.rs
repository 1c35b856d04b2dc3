//! Voice Context - Entities

use serde::{Deserialize, Serialize};

use super::{Gender, LanguageCode, VoiceError};

/// 服务商无关的音色
///
/// 不变量:
/// - id 非空且不含空白字符（保证显示字符串可以无歧义地解析回 id）
/// - 音色有效性总是限定在 (服务商, 区域/endpoint, 引擎, 语言) 范围内，
///   由发现它的目录负责维护这个范围
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    id: String,
    language_code: LanguageCode,
    language_name: String,
    gender: Option<Gender>,
    display_name: Option<String>,
}

impl Voice {
    pub fn new(
        id: impl Into<String>,
        language_code: LanguageCode,
        language_name: impl Into<String>,
        gender: Option<Gender>,
    ) -> Result<Self, VoiceError> {
        let id = id.into();
        if id.is_empty() || id.contains(char::is_whitespace) {
            return Err(VoiceError::InvalidVoice(id));
        }
        let language_name = language_name.into();
        let language_name = if language_name.trim().is_empty() {
            language_code.to_string()
        } else {
            language_name
        };
        Ok(Self {
            id,
            language_code,
            language_name,
            gender,
            display_name: None,
        })
    }

    /// 设置与 id 不同的人类可读名称（仅 provider B 提供）
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        if !display_name.trim().is_empty() {
            self.display_name = Some(display_name);
        }
        self
    }

    // Getters
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn language_code(&self) -> &LanguageCode {
        &self.language_code
    }

    pub fn language_name(&self) -> &str {
        &self.language_name
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

/// 语言：代码 + 名称，由音色列表按代码分组得到
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: LanguageCode,
    pub name: String,
}

impl Language {
    /// 下拉框显示字符串，可被 `LanguageCode::from_display` 解析回代码
    pub fn display(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}

/// 音色显示字符串风格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceLabelStyle {
    /// `Joanna (Female)`
    IdWithGender,
    /// `en-US-AvaNeural (Ava) - Female`
    ShortNameWithLocalName,
}

/// 生成音色的显示字符串
pub fn voice_label(style: VoiceLabelStyle, voice: &Voice) -> String {
    match style {
        VoiceLabelStyle::IdWithGender => match voice.gender() {
            Some(gender) => format!("{} ({})", voice.id(), gender),
            None => voice.id().to_string(),
        },
        VoiceLabelStyle::ShortNameWithLocalName => {
            let mut label = voice.id().to_string();
            if let Some(name) = voice.display_name().filter(|name| *name != voice.id()) {
                label.push_str(&format!(" ({})", name));
            }
            if let Some(gender) = voice.gender() {
                label.push_str(&format!(" - {}", gender));
            }
            label
        }
    }
}

/// 从显示字符串解析出服务商原生 id（`voice_label` 的逆运算）
pub fn parse_voice_label(style: VoiceLabelStyle, label: &str) -> Option<String> {
    let label = label.trim();
    let id = match style {
        VoiceLabelStyle::IdWithGender => label.split_once(" (").map_or(label, |(id, _)| id),
        VoiceLabelStyle::ShortNameWithLocalName => {
            label.split_once(' ').map_or(label, |(id, _)| id)
        }
    };
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en_us() -> LanguageCode {
        LanguageCode::new("en-US").unwrap()
    }

    #[test]
    fn test_voice_rejects_whitespace_id() {
        assert!(Voice::new("Joanna Smith", en_us(), "US English", None).is_err());
        assert!(Voice::new("", en_us(), "US English", None).is_err());
    }

    #[test]
    fn test_language_name_falls_back_to_code() {
        let voice = Voice::new("Joanna", en_us(), "  ", Some(Gender::Female)).unwrap();
        assert_eq!(voice.language_name(), "en-US");
    }

    #[test]
    fn test_polly_label_round_trip() {
        let voice = Voice::new("Joanna", en_us(), "US English", Some(Gender::Female)).unwrap();
        let label = voice_label(VoiceLabelStyle::IdWithGender, &voice);
        assert_eq!(label, "Joanna (Female)");
        assert_eq!(
            parse_voice_label(VoiceLabelStyle::IdWithGender, &label).as_deref(),
            Some("Joanna")
        );
    }

    #[test]
    fn test_azure_label_round_trip() {
        let voice = Voice::new(
            "en-US-AvaMultilingualNeural",
            en_us(),
            "English (United States)",
            Some(Gender::Female),
        )
        .unwrap()
        .with_display_name("Ava Multilingual");
        let label = voice_label(VoiceLabelStyle::ShortNameWithLocalName, &voice);
        assert_eq!(label, "en-US-AvaMultilingualNeural (Ava Multilingual) - Female");
        assert_eq!(
            parse_voice_label(VoiceLabelStyle::ShortNameWithLocalName, &label).as_deref(),
            Some("en-US-AvaMultilingualNeural")
        );
    }

    #[test]
    fn test_azure_label_omits_redundant_parts() {
        let voice = Voice::new("zh-CN-Xiaoxiao", LanguageCode::new("zh-CN").unwrap(), "", None)
            .unwrap()
            .with_display_name("zh-CN-Xiaoxiao");
        let label = voice_label(VoiceLabelStyle::ShortNameWithLocalName, &voice);
        assert_eq!(label, "zh-CN-Xiaoxiao");
    }

    #[test]
    fn test_language_display() {
        let language = Language {
            code: en_us(),
            name: "US English".to_string(),
        };
        assert_eq!(language.display(), "US English (en-US)");
        assert_eq!(
            LanguageCode::from_display(&language.display()).unwrap(),
            language.code
        );
    }
}
