//! Azure Speech Client - 调用 Azure Speech REST API
//!
//! 外部 API:
//! GET  {base}/cognitiveservices/voices/list      → JSON 音色列表
//! POST {base}/cognitiveservices/v1               → SSML 请求，返回音频二进制
//! 认证: Ocp-Apim-Subscription-Key 头
//!
//! 服务端没有区域概念，规范化后的端点作为唯一的伪区域

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::application::ports::{ProviderError, SpeechProviderPort, SpeechRequest};
use crate::domain::voice::{Gender, LanguageCode, OutputFormat, Region, SampleRate, Voice};
use crate::domain::{Credentials, ProviderCapabilities};

const SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";
const TTS_HOST_SUFFIX: &str = ".tts.speech.microsoft.com";
const COGNITIVE_HOST_SUFFIX: &str = ".api.cognitive.microsoft.com";
const USER_AGENT: &str = concat!("voxdesk/", env!("CARGO_PKG_VERSION"));

/// 音色列表条目
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AzureVoice {
    short_name: String,
    #[serde(default)]
    local_name: Option<String>,
    locale: String,
    #[serde(default)]
    locale_name: Option<String>,
    #[serde(default)]
    gender: Option<String>,
}

/// Azure Speech 客户端配置
#[derive(Debug, Clone)]
pub struct AzureSpeechClientConfig {
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 单次请求文本上限
    pub max_text_chars: Option<usize>,
}

impl Default for AzureSpeechClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_text_chars: Some(crate::domain::provider::DEFAULT_MAX_TEXT_CHARS),
        }
    }
}

impl AzureSpeechClientConfig {
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Azure Speech 客户端
pub struct AzureSpeechClient {
    client: Client,
    caps: ProviderCapabilities,
}

impl AzureSpeechClient {
    pub fn new(config: AzureSpeechClientConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            caps: ProviderCapabilities::azure().with_max_text_chars(config.max_text_chars),
        })
    }

    fn voices_url(base: &str) -> String {
        format!("{}/cognitiveservices/voices/list", base)
    }

    fn synthesis_url(base: &str) -> String {
        format!("{}/cognitiveservices/v1", base)
    }

    async fn fetch_voices(&self, credentials: &Credentials) -> Result<Vec<AzureVoice>, ProviderError> {
        let base = normalize_endpoint(credentials.secondary())?;
        let url = Self::voices_url(&base);
        tracing::debug!(url = %url, "Fetching Azure voice list");

        let response = self
            .client
            .get(&url)
            .header(SUBSCRIPTION_HEADER, credentials.primary())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body, false));
        }

        response
            .json::<Vec<AzureVoice>>()
            .await
            .map_err(|e| ProviderError::provider(format!("Invalid voice list response: {}", e)))
    }
}

/// 把用户输入的端点规范化为 TTS 基础 URL（无末尾斜杠）
///
/// - `westus` → `https://westus.tts.speech.microsoft.com`
/// - `https://westus.api.cognitive.microsoft.com/` → `https://westus.tts.speech.microsoft.com`
/// - 其他 URL 只保留 scheme + host + port
pub fn normalize_endpoint(raw: &str) -> Result<String, ProviderError> {
    let raw = raw.trim().trim_end_matches('/');
    if raw.is_empty() {
        return Err(ProviderError::credential_invalid("The Azure endpoint is empty"));
    }

    let is_bare_region = raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if is_bare_region {
        return Ok(format!("https://{}{}", raw.to_ascii_lowercase(), TTS_HOST_SUFFIX));
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let url = Url::parse(&with_scheme).map_err(|e| {
        ProviderError::credential_invalid(format!("Invalid Azure endpoint '{}': {}", raw, e))
    })?;
    let host = url
        .host_str()
        .ok_or_else(|| ProviderError::credential_invalid(format!("Invalid Azure endpoint '{}'", raw)))?
        .to_ascii_lowercase();

    if let Some(region) = host.strip_suffix(COGNITIVE_HOST_SUFFIX) {
        let region = region.split('.').next().unwrap_or(region);
        return Ok(format!("https://{}{}", region, TTS_HOST_SUFFIX));
    }

    Ok(url.origin().ascii_serialization())
}

/// X-Microsoft-OutputFormat 取值
pub fn output_format_header(
    format: OutputFormat,
    sample_rate: SampleRate,
) -> Result<&'static str, ProviderError> {
    let header = match (format, sample_rate.hz()) {
        (OutputFormat::Wav, 16000) => "riff-16khz-16bit-mono-pcm",
        (OutputFormat::Wav, 24000) => "riff-24khz-16bit-mono-pcm",
        (OutputFormat::Wav, 48000) => "riff-48khz-16bit-mono-pcm",
        (OutputFormat::Mp3, 16000) => "audio-16khz-128kbitrate-mono-mp3",
        (OutputFormat::Mp3, 24000) => "audio-24khz-160kbitrate-mono-mp3",
        (OutputFormat::Mp3, 48000) => "audio-48khz-192kbitrate-mono-mp3",
        (OutputFormat::OggOpus, 16000) => "ogg-16khz-16bit-mono-opus",
        (OutputFormat::OggOpus, 24000) => "ogg-24khz-16bit-mono-opus",
        (OutputFormat::OggOpus, 48000) => "ogg-48khz-16bit-mono-opus",
        _ => {
            return Err(ProviderError::provider(format!(
                "Unsupported Azure output: {} at {} Hz",
                format, sample_rate
            )))
        }
    };
    Ok(header)
}

/// 构造 SSML 请求体
pub fn build_ssml(text: &str, voice: &str, locale: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{}'><voice name='{}'>{}</voice></speak>",
        escape_xml(locale),
        escape_xml(voice),
        escape_xml(text)
    )
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 短名形如 `en-US-JennyNeural`，取前两段作为语言
fn locale_of(short_name: &str) -> Option<&str> {
    let mut dashes = short_name.match_indices('-').map(|(i, _)| i);
    let _first = dashes.next()?;
    let second = dashes.next()?;
    Some(&short_name[..second])
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network("Request to Azure timed out")
    } else if e.is_connect() {
        ProviderError::network(format!("Cannot connect to Azure Speech service: {}", e))
    } else {
        ProviderError::network(e.to_string())
    }
}

fn map_status(status: StatusCode, body: &str, synthesis: bool) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::credential_invalid(
            "Invalid subscription key or endpoint",
        ),
        _ if synthesis => {
            let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
            ProviderError::canceled("Error", Some(&detail))
        }
        _ => ProviderError::provider(format!("HTTP {}: {}", status.as_u16(), body.trim())),
    }
}

#[async_trait]
impl SpeechProviderPort for AzureSpeechClient {
    fn capabilities(&self) -> &ProviderCapabilities {
        &self.caps
    }

    async fn list_regions(&self, credentials: &Credentials) -> Result<Vec<Region>, ProviderError> {
        let base = normalize_endpoint(credentials.secondary())?;
        let region = Region::new(base).map_err(|e| ProviderError::provider(e.to_string()))?;
        Ok(vec![region])
    }

    async fn verify_credentials(&self, credentials: &Credentials) -> Result<(), ProviderError> {
        let voices = self.fetch_voices(credentials).await?;
        tracing::info!(voices = voices.len(), "Azure credentials verified");
        Ok(())
    }

    async fn discover_voices(
        &self,
        credentials: &Credentials,
        _region: &Region,
        _engine: Option<crate::domain::voice::Engine>,
    ) -> Result<Vec<Voice>, ProviderError> {
        let raw = self.fetch_voices(credentials).await?;
        let total = raw.len();

        let voices: Vec<Voice> = raw
            .into_iter()
            .filter_map(|v| {
                let code = LanguageCode::new(v.locale.as_str()).ok()?;
                let name = v.locale_name.unwrap_or_else(|| v.locale.clone());
                let gender = v.gender.as_deref().and_then(Gender::parse_lenient);
                let voice = Voice::new(v.short_name, code, name, gender).ok()?;
                Some(match v.local_name {
                    Some(local) if !local.trim().is_empty() => voice.with_display_name(local),
                    _ => voice,
                })
            })
            .collect();

        if voices.len() != total {
            tracing::warn!(
                skipped = total - voices.len(),
                "Skipped malformed Azure voice entries"
            );
        }
        Ok(voices)
    }

    async fn synthesize(
        &self,
        credentials: &Credentials,
        request: &SpeechRequest,
    ) -> Result<Vec<u8>, ProviderError> {
        let base = normalize_endpoint(credentials.secondary())?;
        let output = output_format_header(request.format, request.sample_rate)?;
        let locale = request
            .language
            .as_ref()
            .map(|code| code.as_str().to_string())
            .or_else(|| locale_of(&request.voice_id).map(str::to_string))
            .unwrap_or_else(|| "en-US".to_string());
        let ssml = build_ssml(&request.text, &request.voice_id, &locale);

        tracing::debug!(
            voice = %request.voice_id,
            output_format = output,
            text_len = request.text.len(),
            "Sending Azure synthesis request"
        );

        let response = self
            .client
            .post(Self::synthesis_url(&base))
            .header(SUBSCRIPTION_HEADER, credentials.primary())
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header(OUTPUT_FORMAT_HEADER, output)
            .body(ssml)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body, true));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::network(format!("Failed to read audio: {}", e)))?
            .to_vec();
        if audio.is_empty() {
            return Err(ProviderError::canceled("EndOfStream", Some("no audio data received")));
        }
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ProviderErrorKind;
    use mockito::{Matcher, Server};

    const VOICES_JSON: &str = r#"[
        {"Name": "Microsoft Server Speech Text to Speech Voice (en-US, JennyNeural)",
         "ShortName": "en-US-JennyNeural", "LocalName": "Jenny", "DisplayName": "Jenny",
         "Locale": "en-US", "LocaleName": "English (United States)", "Gender": "Female"},
        {"ShortName": "en-US-GuyNeural", "LocalName": "Guy",
         "Locale": "en-US", "LocaleName": "English (United States)", "Gender": "Male"},
        {"ShortName": "zh-CN-XiaoxiaoNeural", "LocalName": "晓晓",
         "Locale": "zh-CN", "LocaleName": "Chinese (Mandarin, Simplified)", "Gender": "Female"}
    ]"#;

    fn client() -> AzureSpeechClient {
        AzureSpeechClient::new(AzureSpeechClientConfig::default().with_timeout(5)).unwrap()
    }

    fn request(format: OutputFormat, rate: u32) -> SpeechRequest {
        SpeechRequest {
            text: "Tom & Jerry <3".to_string(),
            voice_id: "en-US-JennyNeural".to_string(),
            language: Some(LanguageCode::new("en-US").unwrap()),
            region: None,
            engine: None,
            format,
            sample_rate: SampleRate::new(rate),
        }
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("westus").unwrap(),
            "https://westus.tts.speech.microsoft.com"
        );
        assert_eq!(
            normalize_endpoint("https://eastus.api.cognitive.microsoft.com/").unwrap(),
            "https://eastus.tts.speech.microsoft.com"
        );
        assert_eq!(
            normalize_endpoint("https://westeurope.tts.speech.microsoft.com/cognitiveservices/v1")
                .unwrap(),
            "https://westeurope.tts.speech.microsoft.com"
        );
        assert_eq!(
            normalize_endpoint("http://127.0.0.1:8080").unwrap(),
            "http://127.0.0.1:8080"
        );
        assert!(normalize_endpoint("   ").is_err());
    }

    #[test]
    fn test_ssml_is_escaped() {
        let ssml = build_ssml("Tom & Jerry <3", "en-US-JennyNeural", "en-US");
        assert!(ssml.contains("Tom &amp; Jerry &lt;3"));
        assert!(ssml.contains("<voice name='en-US-JennyNeural'>"));
    }

    #[test]
    fn test_output_format_header() {
        assert_eq!(
            output_format_header(OutputFormat::Wav, SampleRate::new(24000)).unwrap(),
            "riff-24khz-16bit-mono-pcm"
        );
        assert!(output_format_header(OutputFormat::Pcm, SampleRate::new(16000)).is_err());
    }

    #[test]
    fn test_locale_of_short_name() {
        assert_eq!(locale_of("en-US-JennyNeural"), Some("en-US"));
        assert_eq!(locale_of("Jenny"), None);
    }

    #[tokio::test]
    async fn test_discover_voices() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/cognitiveservices/voices/list")
            .match_header(SUBSCRIPTION_HEADER, "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(VOICES_JSON)
            .create_async()
            .await;

        let creds = Credentials::new("test-key", server.url());
        let client = client();
        let region = client.list_regions(&creds).await.unwrap().remove(0);
        let voices = client.discover_voices(&creds, &region, None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(voices.len(), 3);
        let jenny = &voices[0];
        assert_eq!(jenny.id(), "en-US-JennyNeural");
        assert_eq!(jenny.display_name(), Some("Jenny"));
        assert_eq!(jenny.language_name(), "English (United States)");
        assert_eq!(jenny.gender(), Some(Gender::Female));
    }

    #[tokio::test]
    async fn test_verify_rejects_bad_key() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/cognitiveservices/voices/list")
            .with_status(401)
            .create_async()
            .await;

        let creds = Credentials::new("bad-key", server.url());
        let err = client().verify_credentials(&creds).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::CredentialInvalid);
    }

    #[tokio::test]
    async fn test_synthesize_sends_ssml() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/cognitiveservices/v1")
            .match_header(SUBSCRIPTION_HEADER, "test-key")
            .match_header(OUTPUT_FORMAT_HEADER, "audio-24khz-160kbitrate-mono-mp3")
            .match_header("content-type", "application/ssml+xml")
            .match_body(Matcher::Regex("Tom &amp; Jerry".to_string()))
            .with_status(200)
            .with_body(vec![0xFF, 0xFB, 0x90, 0x00])
            .create_async()
            .await;

        let creds = Credentials::new("test-key", server.url());
        let audio = client()
            .synthesize(&creds, &request(OutputFormat::Mp3, 24000))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(audio, vec![0xFF, 0xFB, 0x90, 0x00]);
    }

    #[tokio::test]
    async fn test_synthesis_rejection_is_canceled() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/cognitiveservices/v1")
            .with_status(400)
            .with_body("SSML parse error")
            .create_async()
            .await;

        let creds = Credentials::new("test-key", server.url());
        let err = client()
            .synthesize(&creds, &request(OutputFormat::Wav, 16000))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::Canceled);
        assert_eq!(
            err.message,
            "Speech synthesis failed: Error - HTTP 400: SSML parse error"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let creds = Credentials::new("test-key", "http://127.0.0.1:9");
        let err = client().verify_credentials(&creds).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::NetworkUnavailable);
    }
}
