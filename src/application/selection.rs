//! Selection State Machine - 级联选择
//!
//! 用户的每次字段修改都经过 `on_field_changed`，只向下游级联:
//! region → engine → format/sample_rate → (重新发现) → language → gender → voice
//!
//! 返回 `SelectionDiff` 描述哪些下游字段被重算，以及是否需要重新发现音色。
//! 任何重算得到空集合时，绑定字段被清空，不会保留悬空值

use thiserror::Error;

use crate::application::catalog::CatalogLookup;
use crate::application::error::ApplicationError;
use crate::domain::voice::{
    Engine, GenderFilter, Language, LanguageCode, OutputFormat, Region, SampleRate, VoiceError,
};
use crate::domain::{Field, ProviderCapabilities, Selection};

/// 没有历史语言时优先选择的语言
pub const FALLBACK_LANGUAGE: &str = "en-US";

/// 选择错误
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("'{value}' is not an available {field} option")]
    NotAnOption { field: Field, value: String },

    #[error(transparent)]
    Invalid(#[from] VoiceError),
}

impl From<SelectionError> for ApplicationError {
    fn from(err: SelectionError) -> Self {
        ApplicationError::validation(err.to_string())
    }
}

/// 各字段当前可选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionOptions {
    pub regions: Vec<Region>,
    pub engines: Vec<Engine>,
    pub formats: Vec<OutputFormat>,
    pub sample_rates: Vec<SampleRate>,
    pub languages: Vec<Language>,
    pub genders: Vec<String>,
    pub voices: Vec<String>,
}

/// 一次转换的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionDiff {
    /// 被重算的字段（按级联顺序）
    pub changed: Vec<Field>,
    /// (region, engine) 变化，需要重新发现音色
    pub discovery_required: bool,
    /// 非阻塞提示，例如某区域没有可用引擎
    pub warnings: Vec<String>,
}

impl SelectionDiff {
    fn touch(&mut self, field: Field) {
        if !self.changed.contains(&field) {
            self.changed.push(field);
        }
    }

    /// 合并另一次转换的结果
    pub fn merge(&mut self, other: SelectionDiff) {
        for field in other.changed {
            self.touch(field);
        }
        self.discovery_required |= other.discovery_required;
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && !self.discovery_required && self.warnings.is_empty()
    }
}

/// 选择状态机（每个服务商会话一个）
#[derive(Debug, Clone)]
pub struct SelectionMachine {
    caps: ProviderCapabilities,
    selection: Selection,
    options: SelectionOptions,
    /// 跨发现保留的语言偏好
    preferred_language: Option<LanguageCode>,
}

impl SelectionMachine {
    pub fn new(caps: ProviderCapabilities) -> Self {
        let format = caps.default_format();
        let sample_rates = caps.sample_rates(format).to_vec();
        let selection = Selection {
            format: Some(format),
            sample_rate: caps.default_sample_rate(format, None),
            ..Selection::default()
        };
        let options = SelectionOptions {
            formats: caps.formats().to_vec(),
            sample_rates,
            ..SelectionOptions::default()
        };
        Self {
            caps,
            selection,
            options,
            preferred_language: None,
        }
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        &self.caps
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn options(&self) -> &SelectionOptions {
        &self.options
    }

    /// 填充区域列表并级联到引擎
    pub fn set_regions(
        &mut self,
        regions: Vec<Region>,
        preferred: Option<&Region>,
        lookup: &dyn CatalogLookup,
    ) -> SelectionDiff {
        let mut diff = SelectionDiff::default();
        diff.touch(Field::Region);

        let chosen = preferred
            .filter(|region| regions.contains(region))
            .cloned()
            .or_else(|| regions.first().cloned());
        self.options.regions = regions;
        self.selection.region = chosen;

        if self.selection.region.is_none() {
            diff.warnings.push("No regions available".to_string());
        }

        diff.merge(self.cascade_region(lookup));
        diff
    }

    /// 唯一的字段修改入口
    pub fn on_field_changed(
        &mut self,
        field: Field,
        value: &str,
        lookup: &dyn CatalogLookup,
    ) -> Result<SelectionDiff, SelectionError> {
        let mut diff = SelectionDiff::default();

        match field {
            Field::Region => {
                let region = Region::new(value)?;
                self.ensure_option(field, value, self.options.regions.contains(&region))?;
                if self.selection.region.as_ref() == Some(&region) {
                    return Ok(diff);
                }
                self.selection.region = Some(region);
                diff.touch(Field::Region);
                diff.merge(self.cascade_region(lookup));
            }
            Field::Engine => {
                let engine: Engine = value.parse()?;
                self.ensure_option(field, value, self.options.engines.contains(&engine))?;
                if self.selection.engine == Some(engine) {
                    return Ok(diff);
                }
                self.selection.engine = Some(engine);
                diff.touch(Field::Engine);
                diff.merge(self.cascade_engine());
            }
            Field::Language => {
                let code = LanguageCode::from_display(value)?;
                let listed = self.options.languages.iter().any(|l| l.code == code);
                self.ensure_option(field, value, listed)?;
                self.selection.language = Some(code.clone());
                self.preferred_language = Some(code);
                diff.touch(Field::Language);
                diff.merge(self.cascade_language(lookup));
            }
            Field::Gender => {
                let gender: GenderFilter = value.parse()?;
                let listed = self.options.genders.iter().any(|g| g == gender.label());
                self.ensure_option(field, value, listed)?;
                self.selection.gender = gender;
                diff.touch(Field::Gender);
                diff.merge(self.cascade_gender(lookup));
            }
            Field::Voice => {
                let listed = self.options.voices.iter().any(|v| v == value);
                self.ensure_option(field, value, listed)?;
                self.selection.voice = Some(value.to_string());
                diff.touch(Field::Voice);
            }
            Field::OutputFormat => {
                let format: OutputFormat = value.parse()?;
                self.ensure_option(field, value, self.options.formats.contains(&format))?;
                self.selection.format = Some(format);
                diff.touch(Field::OutputFormat);
                diff.merge(self.cascade_format());
            }
            Field::SampleRate => {
                let rate: SampleRate = value.parse()?;
                self.ensure_option(field, value, self.options.sample_rates.contains(&rate))?;
                self.selection.sample_rate = Some(rate);
                diff.touch(Field::SampleRate);
            }
            Field::Text => {
                self.selection.text = value.to_string();
                diff.touch(Field::Text);
            }
        }

        tracing::debug!(
            provider = %self.caps.kind,
            field = %field,
            changed = ?diff.changed,
            discovery_required = diff.discovery_required,
            "Selection updated"
        );
        Ok(diff)
    }

    /// 发现成功后重建语言列表
    ///
    /// 优先保留上次的语言，其次 en-US，最后取第一个
    pub fn catalog_refreshed(&mut self, lookup: &dyn CatalogLookup) -> SelectionDiff {
        let mut diff = SelectionDiff::default();
        diff.touch(Field::Language);

        let languages = lookup.languages_for();
        let fallback = LanguageCode::new(FALLBACK_LANGUAGE).ok();
        let chosen = [self.preferred_language.as_ref(), fallback.as_ref()]
            .into_iter()
            .flatten()
            .find(|code| languages.iter().any(|l| &l.code == *code))
            .cloned()
            .or_else(|| languages.first().map(|l| l.code.clone()));

        self.options.languages = languages;
        self.selection.language = chosen;

        if self.selection.language.is_none() {
            diff.warnings.push("No languages available for the current selection".to_string());
        }

        diff.merge(self.cascade_language(lookup));
        diff
    }

    /// 发现失败：清空语言及其下游
    pub fn catalog_failed(&mut self) -> SelectionDiff {
        self.clear_catalog_fields()
    }

    fn ensure_option(&self, field: Field, value: &str, listed: bool) -> Result<(), SelectionError> {
        if listed {
            Ok(())
        } else {
            Err(SelectionError::NotAnOption {
                field,
                value: value.to_string(),
            })
        }
    }

    fn cascade_region(&mut self, lookup: &dyn CatalogLookup) -> SelectionDiff {
        let mut diff = SelectionDiff::default();

        if !self.caps.has_engines {
            diff.merge(self.cascade_engine());
            return diff;
        }

        diff.touch(Field::Engine);
        let engines = match &self.selection.region {
            Some(region) => lookup.engines_for(region),
            None => Vec::new(),
        };
        self.selection.engine = Engine::preferred(&engines);
        self.options.engines = engines;

        if self.selection.engine.is_none() {
            if let Some(region) = &self.selection.region {
                diff.warnings
                    .push(format!("No engines available for region {}", region));
            }
        }

        diff.merge(self.cascade_engine());
        diff
    }

    fn cascade_engine(&mut self) -> SelectionDiff {
        let mut diff = SelectionDiff::default();

        self.options.formats = self.caps.formats().to_vec();
        let format = self
            .selection
            .format
            .filter(|format| self.options.formats.contains(format))
            .unwrap_or_else(|| self.caps.default_format());
        self.selection.format = Some(format);
        diff.touch(Field::OutputFormat);
        diff.merge(self.cascade_format());

        diff.merge(self.clear_catalog_fields());

        let scope_ready = if self.caps.has_engines {
            self.selection.engine.is_some()
        } else {
            true
        };
        diff.discovery_required = scope_ready && self.selection.region.is_some();
        diff
    }

    fn cascade_format(&mut self) -> SelectionDiff {
        let mut diff = SelectionDiff::default();
        diff.touch(Field::SampleRate);

        match self.selection.format {
            Some(format) => {
                self.options.sample_rates = self.caps.sample_rates(format).to_vec();
                self.selection.sample_rate =
                    self.caps.default_sample_rate(format, self.selection.engine);
            }
            None => {
                self.options.sample_rates.clear();
                self.selection.sample_rate = None;
            }
        }
        diff
    }

    fn cascade_language(&mut self, lookup: &dyn CatalogLookup) -> SelectionDiff {
        let mut diff = SelectionDiff::default();
        diff.touch(Field::Gender);
        diff.touch(Field::Voice);

        self.selection.gender = GenderFilter::All;
        let Some(language) = self.selection.language.clone() else {
            self.options.genders.clear();
            self.options.voices.clear();
            self.selection.voice = None;
            return diff;
        };

        self.options.genders = lookup.genders_for(&language);
        self.options.voices = lookup.voices_for(&language, &GenderFilter::All);
        self.selection.voice = self.options.voices.first().cloned();

        if self.selection.voice.is_none() {
            diff.warnings
                .push(format!("No voices available for language {}", language));
        }
        diff
    }

    fn cascade_gender(&mut self, lookup: &dyn CatalogLookup) -> SelectionDiff {
        let mut diff = SelectionDiff::default();
        diff.touch(Field::Voice);

        self.options.voices = match &self.selection.language {
            Some(language) => lookup.voices_for(language, &self.selection.gender),
            None => Vec::new(),
        };

        let keep = self
            .selection
            .voice
            .as_ref()
            .is_some_and(|voice| self.options.voices.contains(voice));
        if !keep {
            self.selection.voice = self.options.voices.first().cloned();
        }
        diff
    }

    fn clear_catalog_fields(&mut self) -> SelectionDiff {
        let mut diff = SelectionDiff::default();
        diff.touch(Field::Language);
        diff.touch(Field::Gender);
        diff.touch(Field::Voice);

        self.options.languages.clear();
        self.options.genders.clear();
        self.options.voices.clear();
        self.selection.language = None;
        self.selection.gender = GenderFilter::All;
        self.selection.voice = None;
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::catalog::{CatalogScope, VoiceCatalog};
    use crate::domain::voice::{Gender, Voice};

    /// 区域表 + 内存目录
    struct TestLookup {
        catalog: VoiceCatalog,
    }

    impl TestLookup {
        fn new(caps: &ProviderCapabilities) -> Self {
            let mut catalog = VoiceCatalog::new(caps);
            let voices = vec![
                voice("Joanna", "en-US", "US English", Gender::Female),
                voice("Matthew", "en-US", "US English", Gender::Male),
                voice("Ruth", "en-US", "US English", Gender::Female),
                voice("Vicki", "de-DE", "German", Gender::Female),
                voice("Daniel", "de-DE", "German", Gender::Male),
            ];
            catalog.replace(
                CatalogScope {
                    region: Region::new("us-east-1").unwrap(),
                    engine: Some(Engine::Neural),
                },
                voices,
            );
            Self { catalog }
        }
    }

    impl CatalogLookup for TestLookup {
        fn engines_for(&self, region: &Region) -> Vec<Engine> {
            match region.as_str() {
                "us-east-1" => vec![Engine::Standard, Engine::Neural, Engine::Generative],
                "ap-south-2" => vec![Engine::Standard],
                _ => Vec::new(),
            }
        }

        fn languages_for(&self) -> Vec<Language> {
            self.catalog.languages_for()
        }

        fn genders_for(&self, language: &LanguageCode) -> Vec<String> {
            self.catalog.genders_for(language)
        }

        fn voices_for(&self, language: &LanguageCode, gender: &GenderFilter) -> Vec<String> {
            self.catalog.voices_for(language, gender)
        }
    }

    fn voice(id: &str, code: &str, name: &str, gender: Gender) -> Voice {
        Voice::new(id, LanguageCode::new(code).unwrap(), name, Some(gender)).unwrap()
    }

    fn regions(names: &[&str]) -> Vec<Region> {
        names.iter().map(|n| Region::new(*n).unwrap()).collect()
    }

    fn ready_machine() -> (SelectionMachine, TestLookup) {
        let caps = ProviderCapabilities::polly();
        let lookup = TestLookup::new(&caps);
        let mut machine = SelectionMachine::new(caps);
        let preferred = Region::new("us-east-1").unwrap();
        machine.set_regions(
            regions(&["ap-south-2", "us-east-1", "moon-base-1"]),
            Some(&preferred),
            &lookup,
        );
        machine.catalog_refreshed(&lookup);
        (machine, lookup)
    }

    #[test]
    fn test_region_picks_preferred_engine() {
        let caps = ProviderCapabilities::polly();
        let lookup = TestLookup::new(&caps);
        let mut machine = SelectionMachine::new(caps);

        let diff = machine.set_regions(regions(&["us-east-1"]), None, &lookup);

        assert_eq!(machine.selection().engine, Some(Engine::Neural));
        assert!(diff.discovery_required);
        assert_eq!(machine.selection().format, Some(OutputFormat::Mp3));
        assert_eq!(machine.selection().sample_rate, Some(SampleRate::new(24000)));
        assert!(machine.selection().language.is_none());
    }

    #[test]
    fn test_region_without_engines_clears_engine() {
        let (mut machine, lookup) = ready_machine();

        let diff = machine
            .on_field_changed(Field::Region, "moon-base-1", &lookup)
            .unwrap();

        assert!(machine.selection().engine.is_none());
        assert!(machine.options().engines.is_empty());
        assert!(!diff.discovery_required);
        assert_eq!(diff.warnings, vec!["No engines available for region moon-base-1"]);
        assert!(machine.selection().voice.is_none());
    }

    #[test]
    fn test_standard_engine_defaults_to_22050() {
        let (mut machine, lookup) = ready_machine();

        let diff = machine
            .on_field_changed(Field::Engine, "standard", &lookup)
            .unwrap();

        assert!(diff.discovery_required);
        assert_eq!(machine.selection().sample_rate, Some(SampleRate::new(22050)));
        assert!(machine.options().languages.is_empty());
        assert!(machine.selection().voice.is_none());
    }

    #[test]
    fn test_refresh_prefers_en_us() {
        let (machine, _) = ready_machine();
        let selection = machine.selection();

        assert_eq!(selection.language.as_ref().unwrap().as_str(), "en-US");
        assert_eq!(selection.voice.as_deref(), Some("Joanna (Female)"));
        assert_eq!(machine.options().genders, vec!["All", "Female", "Male"]);
    }

    #[test]
    fn test_refresh_keeps_previous_language() {
        let (mut machine, lookup) = ready_machine();
        machine
            .on_field_changed(Field::Language, "German (de-DE)", &lookup)
            .unwrap();

        machine.on_field_changed(Field::Engine, "generative", &lookup).unwrap();
        machine.catalog_refreshed(&lookup);

        assert_eq!(machine.selection().language.as_ref().unwrap().as_str(), "de-DE");
    }

    #[test]
    fn test_language_change_resets_gender_and_voice() {
        let (mut machine, lookup) = ready_machine();
        machine.on_field_changed(Field::Gender, "Male", &lookup).unwrap();
        assert_eq!(machine.selection().voice.as_deref(), Some("Matthew (Male)"));

        machine
            .on_field_changed(Field::Language, "German (de-DE)", &lookup)
            .unwrap();

        let selection = machine.selection();
        assert_eq!(selection.gender, GenderFilter::All);
        assert_eq!(selection.voice.as_deref(), Some("Daniel (Male)"));
        assert!(machine
            .options()
            .voices
            .iter()
            .all(|v| v.starts_with("Daniel") || v.starts_with("Vicki")));
    }

    #[test]
    fn test_gender_filter_keeps_listed_voice() {
        let (mut machine, lookup) = ready_machine();
        machine
            .on_field_changed(Field::Voice, "Ruth (Female)", &lookup)
            .unwrap();

        let diff = machine.on_field_changed(Field::Gender, "Female", &lookup).unwrap();

        assert_eq!(diff.changed, vec![Field::Gender, Field::Voice]);
        assert_eq!(machine.selection().voice.as_deref(), Some("Ruth (Female)"));
        assert_eq!(machine.options().voices, vec!["Joanna (Female)", "Ruth (Female)"]);
        assert_eq!(machine.selection().language.as_ref().unwrap().as_str(), "en-US");
    }

    #[test]
    fn test_pcm_format_uses_16000() {
        let (mut machine, lookup) = ready_machine();

        machine.on_field_changed(Field::OutputFormat, "pcm", &lookup).unwrap();

        assert_eq!(machine.selection().sample_rate, Some(SampleRate::new(16000)));
        let rates: Vec<u32> = machine.options().sample_rates.iter().map(|r| r.hz()).collect();
        assert_eq!(rates, vec![8000, 16000]);
    }

    #[test]
    fn test_rejects_values_outside_options() {
        let (mut machine, lookup) = ready_machine();

        let err = machine
            .on_field_changed(Field::SampleRate, "22050", &lookup)
            .map(|_| ())
            .and_then(|_| machine.on_field_changed(Field::OutputFormat, "pcm", &lookup))
            .and_then(|_| machine.on_field_changed(Field::SampleRate, "24000", &lookup))
            .unwrap_err();
        assert!(matches!(err, SelectionError::NotAnOption { field: Field::SampleRate, .. }));

        let err = machine
            .on_field_changed(Field::Voice, "Nobody (Male)", &lookup)
            .unwrap_err();
        assert!(matches!(err, SelectionError::NotAnOption { field: Field::Voice, .. }));
        assert_eq!(machine.selection().voice.as_deref(), Some("Joanna (Female)"));
    }

    #[test]
    fn test_catalog_failure_clears_downstream() {
        let (mut machine, _) = ready_machine();

        machine.catalog_failed();

        let selection = machine.selection();
        assert!(selection.language.is_none());
        assert!(selection.voice.is_none());
        assert!(machine.options().voices.is_empty());
        assert_eq!(selection.region.as_ref().unwrap().as_str(), "us-east-1");
    }

    #[test]
    fn test_azure_has_no_engine_cascade() {
        let caps = ProviderCapabilities::azure();
        let lookup = TestLookup::new(&caps);
        let mut machine = SelectionMachine::new(caps);

        let diff = machine.set_regions(regions(&["https://westus.tts.speech.microsoft.com"]), None, &lookup);

        assert!(diff.discovery_required);
        assert!(diff.warnings.is_empty());
        assert!(machine.selection().engine.is_none());
        assert_eq!(machine.selection().format, Some(OutputFormat::Wav));
        assert_eq!(machine.selection().sample_rate, Some(SampleRate::new(24000)));
    }
}
