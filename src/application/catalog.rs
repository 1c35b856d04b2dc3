//! Voice Catalog - 服务商目录解析
//!
//! `CatalogResolver` 把原始凭据变成可查询的归一化目录:
//! - `list_regions` / `engines_for`: 区域与引擎（引擎是静态配置）
//! - `discover_voices`: 唯一的网络往返，成功后整体替换内存索引
//! - `languages_for` / `voices_for` / `genders_for`: 只读内存索引，不再访问网络
//! - `resolve_voice_id`: 显示字符串 → 服务商原生 id
//!
//! 发现失败时目录保持原样（旧但有效），绝不部分覆盖

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::SpeechProviderPort;
use crate::domain::voice::{
    parse_voice_label, voice_label, Engine, GenderFilter, Language, LanguageCode, Region, Voice,
    VoiceLabelStyle,
};
use crate::domain::{Credentials, ProviderCapabilities};

/// 选择状态机依赖的只读查询
pub trait CatalogLookup {
    fn engines_for(&self, region: &Region) -> Vec<Engine>;
    fn languages_for(&self) -> Vec<Language>;
    fn genders_for(&self, language: &LanguageCode) -> Vec<String>;
    fn voices_for(&self, language: &LanguageCode, gender: &GenderFilter) -> Vec<String>;
}

/// 目录的有效范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogScope {
    pub region: Region,
    pub engine: Option<Engine>,
}

#[derive(Debug, Clone)]
struct LanguageEntry {
    name: String,
    voices: Vec<Voice>,
}

/// 语言 → 音色的内存索引
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    label_style: VoiceLabelStyle,
    gender_filter: bool,
    scope: Option<CatalogScope>,
    languages: BTreeMap<LanguageCode, LanguageEntry>,
}

impl VoiceCatalog {
    pub fn new(caps: &ProviderCapabilities) -> Self {
        Self {
            label_style: caps.label_style,
            gender_filter: caps.gender_filter,
            scope: None,
            languages: BTreeMap::new(),
        }
    }

    /// 用一次成功发现的结果整体替换索引
    pub fn replace(&mut self, scope: CatalogScope, voices: Vec<Voice>) {
        let mut languages: BTreeMap<LanguageCode, LanguageEntry> = BTreeMap::new();
        for voice in voices {
            let entry = languages
                .entry(voice.language_code().clone())
                .or_insert_with(|| LanguageEntry {
                    name: voice.language_name().to_string(),
                    voices: Vec::new(),
                });
            entry.voices.push(voice);
        }
        self.languages = languages;
        self.scope = Some(scope);
    }

    pub fn scope(&self) -> Option<&CatalogScope> {
        self.scope.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.scope.is_some()
    }

    pub fn voice_count(&self) -> usize {
        self.languages.values().map(|entry| entry.voices.len()).sum()
    }

    /// 按名称排序的 (代码, 名称) 列表；发现成功前为空
    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self
            .languages
            .iter()
            .map(|(code, entry)| Language {
                code: code.clone(),
                name: entry.name.clone(),
            })
            .collect();
        languages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        languages
    }

    /// 某语言下的音色显示字符串，按显示字符串排序
    pub fn voices(&self, language: &LanguageCode, gender: &GenderFilter) -> Vec<String> {
        let Some(entry) = self.languages.get(language) else {
            return Vec::new();
        };
        let filter = if self.gender_filter {
            *gender
        } else {
            GenderFilter::All
        };
        let mut labels: Vec<String> = entry
            .voices
            .iter()
            .filter(|voice| filter.matches(voice.gender()))
            .map(|voice| voice_label(self.label_style, voice))
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }

    /// "All" + 该语言实际出现的性别
    pub fn genders(&self, language: &LanguageCode) -> Vec<String> {
        let mut genders = vec![GenderFilter::ALL_LABEL.to_string()];
        if !self.gender_filter {
            return genders;
        }
        if let Some(entry) = self.languages.get(language) {
            let present: BTreeSet<_> = entry.voices.iter().filter_map(Voice::gender).collect();
            genders.extend(present.into_iter().map(|gender| gender.to_string()));
        }
        genders
    }

    /// 纯解析：显示字符串 → 原生 id
    pub fn resolve_voice_id(&self, display: &str) -> Option<String> {
        parse_voice_label(self.label_style, display)
    }

    /// 按显示字符串查找音色
    pub fn find_voice(&self, language: &LanguageCode, display: &str) -> Option<&Voice> {
        self.languages.get(language).and_then(|entry| {
            entry
                .voices
                .iter()
                .find(|voice| voice_label(self.label_style, voice) == display)
        })
    }
}

/// 服务商目录解析器
pub struct CatalogResolver {
    provider: Arc<dyn SpeechProviderPort>,
    catalog: VoiceCatalog,
}

impl CatalogResolver {
    pub fn new(provider: Arc<dyn SpeechProviderPort>) -> Self {
        let catalog = VoiceCatalog::new(provider.capabilities());
        Self { provider, catalog }
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        self.provider.capabilities()
    }

    pub fn provider(&self) -> &Arc<dyn SpeechProviderPort> {
        &self.provider
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    /// 可用区域
    pub async fn list_regions(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<Region>, ApplicationError> {
        let regions = self.provider.list_regions(credentials).await?;
        tracing::debug!(
            provider = %self.capabilities().kind,
            count = regions.len(),
            "Regions listed"
        );
        Ok(regions)
    }

    /// 发现音色并替换索引，返回音色数量
    ///
    /// 失败时索引保持不变
    pub async fn discover_voices(
        &mut self,
        credentials: &Credentials,
        region: &Region,
        engine: Option<Engine>,
    ) -> Result<usize, ApplicationError> {
        let provider = self.capabilities().kind;
        let voices = match self
            .provider
            .discover_voices(credentials, region, engine)
            .await
        {
            Ok(voices) => voices,
            Err(err) => {
                tracing::warn!(
                    provider = %provider,
                    region = %region,
                    engine = ?engine,
                    error = %err,
                    "Voice discovery failed, keeping previous catalog"
                );
                return Err(err.into());
            }
        };

        let count = voices.len();
        self.catalog.replace(
            CatalogScope {
                region: region.clone(),
                engine,
            },
            voices,
        );

        tracing::info!(
            provider = %provider,
            region = %region,
            engine = ?engine,
            voices = count,
            languages = self.catalog.languages.len(),
            "Voice catalog refreshed"
        );
        Ok(count)
    }

    pub fn resolve_voice_id(&self, display: &str) -> Option<String> {
        self.catalog.resolve_voice_id(display)
    }

    /// 丢弃已发现的目录（切换账号时）
    pub fn reset(&mut self) {
        self.catalog = VoiceCatalog::new(self.provider.capabilities());
    }
}

impl CatalogLookup for VoiceCatalog {
    fn engines_for(&self, _region: &Region) -> Vec<Engine> {
        Vec::new()
    }

    fn languages_for(&self) -> Vec<Language> {
        self.languages()
    }

    fn genders_for(&self, language: &LanguageCode) -> Vec<String> {
        self.genders(language)
    }

    fn voices_for(&self, language: &LanguageCode, gender: &GenderFilter) -> Vec<String> {
        self.voices(language, gender)
    }
}

impl CatalogLookup for CatalogResolver {
    fn engines_for(&self, region: &Region) -> Vec<Engine> {
        self.provider.engines_for(region)
    }

    fn languages_for(&self) -> Vec<Language> {
        self.catalog.languages()
    }

    fn genders_for(&self, language: &LanguageCode) -> Vec<String> {
        self.catalog.genders(language)
    }

    fn voices_for(&self, language: &LanguageCode, gender: &GenderFilter) -> Vec<String> {
        self.catalog.voices(language, gender)
    }
}
