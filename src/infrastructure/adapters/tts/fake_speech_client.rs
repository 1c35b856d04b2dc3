//! Fake Speech Provider - 用于测试和离线演示的服务商
//!
//! 返回配置好的音色和固定音频，可按操作注入失败，并统计调用次数

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::polly_regions;
use crate::application::ports::{ProviderError, SpeechProviderPort, SpeechRequest};
use crate::domain::voice::{Engine, Region, Voice};
use crate::domain::{Credentials, ProviderCapabilities};

/// Fake Provider 配置
#[derive(Debug, Clone)]
pub struct FakeSpeechProviderConfig {
    pub caps: ProviderCapabilities,
    pub regions: Vec<Region>,
    pub voices: Vec<Voice>,
    /// 固定返回的音频数据
    pub audio: Vec<u8>,
}

impl Default for FakeSpeechProviderConfig {
    fn default() -> Self {
        Self {
            caps: ProviderCapabilities::polly(),
            regions: ["us-east-1", "eu-west-1"]
                .into_iter()
                .filter_map(|name| Region::new(name).ok())
                .collect(),
            voices: Vec::new(),
            // ID3 头，足以让调用方识别为 mp3
            audio: vec![0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        }
    }
}

#[derive(Default)]
struct Failures {
    verify: Option<ProviderError>,
    discovery: Option<ProviderError>,
    synthesis: Option<ProviderError>,
}

/// Fake Speech Provider
pub struct FakeSpeechProvider {
    config: FakeSpeechProviderConfig,
    audio: Mutex<Vec<u8>>,
    failures: Mutex<Failures>,
    last_request: Mutex<Option<SpeechRequest>>,
    verify_calls: AtomicUsize,
    discover_calls: AtomicUsize,
    synthesize_calls: AtomicUsize,
}

impl FakeSpeechProvider {
    pub fn new(config: FakeSpeechProviderConfig) -> Self {
        tracing::info!(
            provider = %config.caps.kind,
            voices = config.voices.len(),
            "FakeSpeechProvider initialized"
        );
        Self {
            audio: Mutex::new(config.audio.clone()),
            config,
            failures: Mutex::new(Failures::default()),
            last_request: Mutex::new(None),
            verify_calls: AtomicUsize::new(0),
            discover_calls: AtomicUsize::new(0),
            synthesize_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_audio(&self, audio: Vec<u8>) {
        if let Ok(mut guard) = self.audio.lock() {
            *guard = audio;
        }
    }

    pub fn fail_verify_with(&self, err: ProviderError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.verify = Some(err);
        }
    }

    pub fn fail_discovery_with(&self, err: ProviderError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.discovery = Some(err);
        }
    }

    pub fn fail_synthesis_with(&self, err: ProviderError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.synthesis = Some(err);
        }
    }

    pub fn last_request(&self) -> Option<SpeechRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn synthesize_calls(&self) -> usize {
        self.synthesize_calls.load(Ordering::SeqCst)
    }

    fn injected(&self, pick: impl FnOnce(&Failures) -> Option<ProviderError>) -> Result<(), ProviderError> {
        match self.failures.lock() {
            Ok(failures) => match pick(&failures) {
                Some(err) => Err(err),
                None => Ok(()),
            },
            Err(_) => Err(ProviderError::provider("fake provider state poisoned")),
        }
    }
}

#[async_trait]
impl SpeechProviderPort for FakeSpeechProvider {
    fn capabilities(&self) -> &ProviderCapabilities {
        &self.config.caps
    }

    async fn list_regions(&self, _credentials: &Credentials) -> Result<Vec<Region>, ProviderError> {
        Ok(self.config.regions.clone())
    }

    fn engines_for(&self, region: &Region) -> Vec<Engine> {
        if self.config.caps.has_engines {
            polly_regions::engines_for(region)
        } else {
            Vec::new()
        }
    }

    async fn verify_credentials(&self, _credentials: &Credentials) -> Result<(), ProviderError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.injected(|f| f.verify.clone())
    }

    async fn discover_voices(
        &self,
        _credentials: &Credentials,
        region: &Region,
        engine: Option<Engine>,
    ) -> Result<Vec<Voice>, ProviderError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        self.injected(|f| f.discovery.clone())?;
        tracing::debug!(region = %region, engine = ?engine, "FakeSpeechProvider: returning voices");
        Ok(self.config.voices.clone())
    }

    async fn synthesize(
        &self,
        _credentials: &Credentials,
        request: &SpeechRequest,
    ) -> Result<Vec<u8>, ProviderError> {
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        self.injected(|f| f.synthesis.clone())?;

        tracing::debug!(
            voice_id = %request.voice_id,
            text_len = request.text.len(),
            "FakeSpeechProvider: returning fixed audio"
        );
        Ok(self.audio.lock().map(|a| a.clone()).unwrap_or_default())
    }
}
