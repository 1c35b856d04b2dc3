//! Synthesis Orchestrator - 合成编排
//!
//! 所有前置校验都在网络调用之前完成；每次调用只发一个请求，
//! 不批处理、不重试。原始 PCM 在返回前封装为 WAV

use std::sync::Arc;

use crate::application::catalog::CatalogResolver;
use crate::application::error::ApplicationError;
use crate::application::ports::{AudioTranscoderPort, SpeechRequest};
use crate::domain::voice::{OutputFormat, SampleRate};
use crate::domain::{Credentials, ProviderCapabilities, Selection};

/// 剩余字符数低于该值时提示
pub const NEAR_LIMIT_MARGIN: usize = 100;

/// 合成成功的音频
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub data: Vec<u8>,
    /// 数据的实际格式（PCM 封装后为 Wav）
    pub format: OutputFormat,
    pub sample_rate: SampleRate,
    pub voice_id: String,
    /// 仅对 WAV 数据可知
    pub duration_ms: Option<u64>,
}

pub type SynthesisResult = Result<SynthesizedAudio, ApplicationError>;

/// 字符计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCount {
    pub used: usize,
    pub limit: Option<usize>,
}

impl CharCount {
    pub fn remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }

    pub fn exceeded(&self) -> bool {
        self.limit.is_some_and(|limit| self.used > limit)
    }

    pub fn near_limit(&self) -> bool {
        self.remaining()
            .is_some_and(|remaining| remaining < NEAR_LIMIT_MARGIN)
    }
}

impl std::fmt::Display for CharCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "{}/{}", self.used, limit),
            None => write!(f, "{}", self.used),
        }
    }
}

/// 合成编排器
pub struct SynthesisOrchestrator {
    transcoder: Arc<dyn AudioTranscoderPort>,
}

impl SynthesisOrchestrator {
    pub fn new(transcoder: Arc<dyn AudioTranscoderPort>) -> Self {
        Self { transcoder }
    }

    pub fn char_count(caps: &ProviderCapabilities, text: &str) -> CharCount {
        CharCount {
            used: text.chars().count(),
            limit: caps.max_text_chars,
        }
    }

    /// 校验并构造请求，不访问网络
    pub fn prepare(
        &self,
        resolver: &CatalogResolver,
        credentials: Option<&Credentials>,
        selection: &Selection,
    ) -> Result<SpeechRequest, ApplicationError> {
        let caps = resolver.capabilities();

        let text = selection.trimmed_text();
        if text.is_empty() {
            return Err(ApplicationError::validation("Please enter text."));
        }
        let count = Self::char_count(caps, text);
        if count.exceeded() {
            return Err(ApplicationError::validation(format!(
                "Text exceeds the {} character limit ({} characters).",
                count.limit.unwrap_or_default(),
                count.used
            )));
        }

        if !credentials.is_some_and(Credentials::is_complete) {
            return Err(ApplicationError::CredentialMissing(format!(
                "Please enter your {} credentials.",
                caps.kind.display_name()
            )));
        }

        let Some(display) = selection.voice.as_deref() else {
            return Err(ApplicationError::validation("Please select a voice."));
        };

        let missing = selection.missing_config_fields(caps);
        if !missing.is_empty() {
            let fields: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
            return Err(ApplicationError::validation(format!(
                "Voice configuration is incomplete: missing {}.",
                fields.join(", ")
            )));
        }

        let voice_id = resolver.resolve_voice_id(display).ok_or_else(|| {
            ApplicationError::validation(format!("Unrecognized voice: {}", display))
        })?;

        // missing_config_fields 已保证 language / format / sample_rate 存在
        let (Some(format), Some(sample_rate)) = (selection.format, selection.sample_rate) else {
            return Err(ApplicationError::validation(
                "Voice configuration is incomplete.",
            ));
        };

        Ok(SpeechRequest {
            text: text.to_string(),
            voice_id,
            language: selection.language.clone(),
            region: selection.region.clone(),
            engine: selection.engine,
            format,
            sample_rate,
        })
    }

    /// 执行一次合成
    pub async fn synthesize(
        &self,
        resolver: &CatalogResolver,
        credentials: Option<&Credentials>,
        selection: &Selection,
    ) -> SynthesisResult {
        let request = self.prepare(resolver, credentials, selection)?;
        let provider = resolver.capabilities().kind;
        let credentials = credentials.ok_or_else(|| {
            ApplicationError::CredentialMissing("Credentials are required.".to_string())
        })?;

        tracing::info!(
            provider = %provider,
            voice_id = %request.voice_id,
            engine = ?request.engine,
            format = %request.format,
            sample_rate = request.sample_rate.hz(),
            chars = request.text.chars().count(),
            "Starting synthesis"
        );

        let start = std::time::Instant::now();
        let data = resolver
            .provider()
            .synthesize(credentials, &request)
            .await
            .map_err(|e| {
                tracing::error!(provider = %provider, error = %e, "Synthesis failed");
                ApplicationError::from_synthesis(e)
            })?;

        if data.is_empty() {
            return Err(ApplicationError::SynthesisFailed(
                "Speech synthesis failed: provider returned no audio".to_string(),
            ));
        }

        let (data, format) = if request.format.is_raw_pcm() {
            (
                self.transcoder.wrap_pcm(&data, request.sample_rate),
                OutputFormat::Wav,
            )
        } else {
            (data, request.format)
        };

        let duration_ms = if format == OutputFormat::Wav {
            self.transcoder
                .get_audio_info(&data)
                .map(|info| info.duration_ms)
                .ok()
        } else {
            None
        };

        tracing::info!(
            provider = %provider,
            voice_id = %request.voice_id,
            format = %format,
            bytes = data.len(),
            duration_ms = ?duration_ms,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Synthesis completed"
        );

        Ok(SynthesizedAudio {
            data,
            format,
            sample_rate: request.sample_rate,
            voice_id: request.voice_id,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::ErrorKind;
    use crate::application::ports::ProviderError;
    use crate::application::selection::SelectionMachine;
    use crate::domain::voice::{Engine, Gender, LanguageCode, Region, Voice};
    use crate::domain::Field;
    use crate::infrastructure::adapters::{
        FakeSpeechProvider, FakeSpeechProviderConfig, WavTranscoder,
    };

    fn fake() -> Arc<FakeSpeechProvider> {
        let lang = LanguageCode::new("en-US").unwrap();
        Arc::new(FakeSpeechProvider::new(FakeSpeechProviderConfig {
            voices: vec![
                Voice::new("Matthew", lang.clone(), "US English", Some(Gender::Male)).unwrap(),
                Voice::new("Joanna", lang, "US English", Some(Gender::Female)).unwrap(),
            ],
            audio: vec![0x49, 0x44, 0x33, 0x04, 0x00],
            ..Default::default()
        }))
    }

    async fn ready(
        fake: &Arc<FakeSpeechProvider>,
    ) -> (CatalogResolver, SelectionMachine, Credentials) {
        let creds = Credentials::new("AKIDEXAMPLE", "secret");
        let mut resolver = CatalogResolver::new(fake.clone());
        let mut machine = SelectionMachine::new(resolver.capabilities().clone());

        let regions = resolver.list_regions(&creds).await.unwrap();
        let preferred = Region::new("us-east-1").unwrap();
        let diff = machine.set_regions(regions, Some(&preferred), &resolver);
        assert!(diff.discovery_required);

        let selection = machine.selection().clone();
        resolver
            .discover_voices(&creds, selection.region.as_ref().unwrap(), selection.engine)
            .await
            .unwrap();
        machine.catalog_refreshed(&resolver);
        (resolver, machine, creds)
    }

    fn orchestrator() -> SynthesisOrchestrator {
        SynthesisOrchestrator::new(Arc::new(WavTranscoder::new()))
    }

    #[tokio::test]
    async fn test_hello_world_mp3() {
        let fake = fake();
        let (resolver, mut machine, creds) = ready(&fake).await;
        machine
            .on_field_changed(Field::Text, "Hello world", &resolver)
            .unwrap();

        let selection = machine.selection();
        assert_eq!(selection.region.as_ref().unwrap().as_str(), "us-east-1");
        assert_eq!(selection.voice.as_deref(), Some("Joanna (Female)"));
        assert_eq!(selection.sample_rate.unwrap().hz(), 24000);

        let audio = orchestrator()
            .synthesize(&resolver, Some(&creds), selection)
            .await
            .unwrap();

        assert_eq!(audio.format, OutputFormat::Mp3);
        assert!(!audio.data.is_empty());
        assert_eq!(audio.voice_id, "Joanna");
        assert!(audio.duration_ms.is_none());

        let request = fake.last_request().unwrap();
        assert_eq!(request.voice_id, "Joanna");
        assert_eq!(request.engine, Some(Engine::Neural));
        assert_eq!(request.text, "Hello world");
    }

    #[tokio::test]
    async fn test_pcm_is_wrapped_in_wav() {
        let fake = fake();
        fake.set_audio(vec![0u8; 3200]);
        let (resolver, mut machine, creds) = ready(&fake).await;
        machine.on_field_changed(Field::OutputFormat, "pcm", &resolver).unwrap();
        machine.on_field_changed(Field::SampleRate, "16000", &resolver).unwrap();
        machine.on_field_changed(Field::Text, "Hello", &resolver).unwrap();

        let audio = orchestrator()
            .synthesize(&resolver, Some(&creds), machine.selection())
            .await
            .unwrap();

        assert_eq!(&audio.data[0..4], b"RIFF");
        assert_eq!(&audio.data[36..40], b"data");
        let data_len = u32::from_le_bytes([
            audio.data[40],
            audio.data[41],
            audio.data[42],
            audio.data[43],
        ]);
        assert_eq!(data_len, 3200);
        assert_eq!(audio.format, OutputFormat::Wav);
        assert_eq!(audio.duration_ms, Some(100));
    }

    #[tokio::test]
    async fn test_whitespace_text_makes_no_call() {
        let fake = fake();
        let (resolver, mut machine, creds) = ready(&fake).await;
        machine.on_field_changed(Field::Text, "   \n\t", &resolver).unwrap();

        let err = orchestrator()
            .synthesize(&resolver, Some(&creds), machine.selection())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.to_string(), "Please enter text.");
        assert_eq!(fake.synthesize_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_credentials_and_voice() {
        let fake = fake();
        let (resolver, mut machine, creds) = ready(&fake).await;
        machine.on_field_changed(Field::Text, "Hello", &resolver).unwrap();

        let err = orchestrator()
            .synthesize(&resolver, None, machine.selection())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialMissing);

        machine.catalog_failed();
        let err = orchestrator()
            .synthesize(&resolver, Some(&creds), machine.selection())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please select a voice.");
        assert_eq!(fake.synthesize_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_language_makes_no_call() {
        let fake = fake();
        let (resolver, mut machine, creds) = ready(&fake).await;
        machine.on_field_changed(Field::Text, "Hello", &resolver).unwrap();
        let mut selection = machine.selection().clone();
        assert!(selection.voice.is_some());
        selection.language = None;

        let err = orchestrator()
            .synthesize(&resolver, Some(&creds), &selection)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(
            err.to_string(),
            "Voice configuration is incomplete: missing language."
        );
        assert_eq!(fake.synthesize_calls(), 0);
    }

    #[tokio::test]
    async fn test_text_over_limit_rejected() {
        let fake = fake();
        let (resolver, mut machine, creds) = ready(&fake).await;
        let long = "a".repeat(3001);
        machine.on_field_changed(Field::Text, &long, &resolver).unwrap();

        let err = orchestrator()
            .synthesize(&resolver, Some(&creds), machine.selection())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(fake.synthesize_calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_surfaced() {
        let fake = fake();
        let (resolver, mut machine, creds) = ready(&fake).await;
        machine.on_field_changed(Field::Text, "Hello", &resolver).unwrap();
        fake.fail_synthesis_with(ProviderError::canceled("Error", Some("quota exceeded")));

        let err = orchestrator()
            .synthesize(&resolver, Some(&creds), machine.selection())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SynthesisFailed);
        assert!(err.is_blocking());
        assert_eq!(err.to_string(), "Speech synthesis failed: Error - quota exceeded");
        assert_eq!(fake.synthesize_calls(), 1);
    }

    #[test]
    fn test_char_count() {
        let caps = ProviderCapabilities::azure();
        let count = SynthesisOrchestrator::char_count(&caps, &"é".repeat(2950));
        assert_eq!(count.used, 2950);
        assert_eq!(count.remaining(), Some(50));
        assert!(count.near_limit());
        assert!(!count.exceeded());
        assert_eq!(count.to_string(), "2950/3000");

        let unlimited = caps.with_max_text_chars(None);
        assert!(!SynthesisOrchestrator::char_count(&unlimited, "hi").near_limit());
    }
}
