//! Selection - 用户当前的选择
//!
//! {区域|endpoint, 引擎, 语言, 性别过滤, 音色, 格式, 采样率, 文本}
//!
//! 不变量: 合成前除文本与性别过滤外的必需字段都必须非空，
//! 哪些字段必需由 `ProviderCapabilities` 决定

use serde::{Deserialize, Serialize};

use super::provider::ProviderCapabilities;
use super::voice::{Engine, GenderFilter, LanguageCode, OutputFormat, Region, SampleRate};

/// 可被用户修改的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Region,
    Engine,
    Language,
    Gender,
    Voice,
    OutputFormat,
    SampleRate,
    Text,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Engine => "engine",
            Self::Language => "language",
            Self::Gender => "gender",
            Self::Voice => "voice",
            Self::OutputFormat => "output_format",
            Self::SampleRate => "sample_rate",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub region: Option<Region>,
    pub engine: Option<Engine>,
    pub language: Option<LanguageCode>,
    pub gender: GenderFilter,
    /// 音色显示字符串（下拉框中的值）
    pub voice: Option<String>,
    pub format: Option<OutputFormat>,
    pub sample_rate: Option<SampleRate>,
    pub text: String,
}

impl Selection {
    /// 列出在当前能力下缺失的必需字段（不含文本与音色）
    pub fn missing_config_fields(&self, caps: &ProviderCapabilities) -> Vec<Field> {
        let mut missing = Vec::new();
        if caps.has_regions && self.region.is_none() {
            missing.push(Field::Region);
        }
        if caps.has_engines && self.engine.is_none() {
            missing.push(Field::Engine);
        }
        if self.language.is_none() {
            missing.push(Field::Language);
        }
        if self.format.is_none() {
            missing.push(Field::OutputFormat);
        }
        if self.sample_rate.is_none() {
            missing.push(Field::SampleRate);
        }
        missing
    }

    /// 去掉首尾空白后的文本
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}
