//! Amazon Polly Client - 基于 AWS SDK 的语音服务商适配器
//!
//! - 凭据校验: STS GetCallerIdentity
//! - 音色发现: DescribeVoices (按引擎过滤，分页)
//! - 合成: SynthesizeSpeech，直接收集音频流
//!
//! SDK 客户端按 (凭据摘要, region) 缓存，凭据变化时清空旧客户端

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_polly::config::{Credentials as AwsCredentials, Region as AwsRegion};
use aws_sdk_polly::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_polly::types::{
    Engine as PollyEngine, OutputFormat as PollyOutputFormat, VoiceId,
};
use dashmap::DashMap;
use std::time::Duration;
use zeroize::Zeroize;

use super::polly_regions;
use crate::application::ports::{ProviderError, SpeechProviderPort, SpeechRequest};
use crate::domain::voice::{Engine, Gender, LanguageCode, OutputFormat, Region, Voice};
use crate::domain::{Credentials, ProviderCapabilities};

/// SDK 凭据来源名称
const PROVIDER_NAME: &str = "voxdesk";

/// Polly 客户端配置
#[derive(Debug, Clone)]
pub struct AwsPollyClientConfig {
    /// 凭据校验使用的区域
    pub verify_region: String,
    /// 单次操作超时（秒）
    pub timeout_secs: u64,
    /// 单次请求文本上限
    pub max_text_chars: Option<usize>,
}

impl Default for AwsPollyClientConfig {
    fn default() -> Self {
        Self {
            verify_region: "us-east-1".to_string(),
            timeout_secs: 30,
            max_text_chars: Some(crate::domain::provider::DEFAULT_MAX_TEXT_CHARS),
        }
    }
}

/// Amazon Polly 适配器
pub struct AwsPollyClient {
    config: AwsPollyClientConfig,
    caps: ProviderCapabilities,
    clients: DashMap<String, aws_sdk_polly::Client>,
}

impl AwsPollyClient {
    pub fn new(config: AwsPollyClientConfig) -> Self {
        let caps = ProviderCapabilities::polly().with_max_text_chars(config.max_text_chars);
        Self {
            config,
            caps,
            clients: DashMap::new(),
        }
    }

    async fn sdk_config(&self, credentials: &Credentials, region: &str) -> SdkConfig {
        let aws_credentials = AwsCredentials::new(
            credentials.primary(),
            credentials.secondary(),
            None,
            None,
            PROVIDER_NAME,
        );
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(self.config.timeout_secs))
            .build();

        aws_config::defaults(BehaviorVersion::latest())
            .region(AwsRegion::new(region.to_string()))
            .credentials_provider(aws_credentials)
            .timeout_config(timeouts)
            .load()
            .await
    }

    async fn polly(&self, credentials: &Credentials, region: &Region) -> aws_sdk_polly::Client {
        let fingerprint = credentials_fingerprint(credentials);
        let key = client_cache_key(&fingerprint, region);
        if let Some(client) = self.clients.get(&key) {
            return client.clone();
        }

        // 凭据变化后旧客户端不再可用
        let before = self.clients.len();
        self.clients.retain(|k, _| k.ends_with(&fingerprint));
        let evicted = before.saturating_sub(self.clients.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Polly clients for previous credentials dropped");
        }

        let config = self.sdk_config(credentials, region.as_str()).await;
        let client = aws_sdk_polly::Client::new(&config);
        self.clients.insert(key, client.clone());
        tracing::debug!(region = %region, "Polly client created");
        client
    }

    fn polly_engine(engine: Engine) -> PollyEngine {
        PollyEngine::from(engine.as_str())
    }

    fn polly_format(format: OutputFormat) -> Result<PollyOutputFormat, ProviderError> {
        match format {
            OutputFormat::Mp3 => Ok(PollyOutputFormat::Mp3),
            OutputFormat::OggVorbis => Ok(PollyOutputFormat::OggVorbis),
            OutputFormat::Pcm => Ok(PollyOutputFormat::Pcm),
            other => Err(ProviderError::provider(format!(
                "Output format {} is not supported by Amazon Polly",
                other
            ))),
        }
    }

    fn to_voice(voice: &aws_sdk_polly::types::Voice) -> Option<Voice> {
        let id = voice.id()?.as_str();
        let code = LanguageCode::new(voice.language_code()?.as_str()).ok()?;
        let name = voice.language_name().unwrap_or_default();
        let gender = voice.gender().and_then(|g| Gender::parse_lenient(g.as_str()));
        Voice::new(id, code, name, gender).ok()
    }
}

/// 按已知错误码/关键字把 AWS 错误归类
pub fn classify_aws_error(code: Option<&str>, message: &str) -> ProviderError {
    let haystack = format!("{} {}", code.unwrap_or_default(), message);
    let contains = |needle: &str| haystack.contains(needle);

    if contains("EndpointConnectionError") {
        ProviderError::network("Could not connect to AWS - check your internet connection")
    } else if contains("ConnectionError") || contains("dispatch failure") {
        ProviderError::network("Network connection error - please check your internet")
    } else if contains("InvalidClientTokenId") || contains("UnrecognizedClientException") {
        ProviderError::credential_invalid("The AWS Access Key ID is invalid")
    } else if contains("SignatureDoesNotMatch") || contains("InvalidSignatureException") {
        ProviderError::credential_invalid("The AWS Secret Access Key is invalid")
    } else if contains("AuthFailure") {
        ProviderError::credential_invalid("Authentication failed - check your credentials")
    } else if contains("ExpiredToken") {
        ProviderError::credential_invalid("Credentials have expired - please generate new ones")
    } else if contains("AccessDenied") {
        ProviderError::credential_invalid(
            "Access denied - the credentials don't have proper permissions",
        )
    } else {
        let detail = code
            .map(str::to_string)
            .unwrap_or_else(|| message.rsplit(':').next().unwrap_or(message).trim().to_string());
        ProviderError::provider(format!("AWS Error: {}", detail))
    }
}

fn map_sdk_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::DispatchFailure(_) => {
            tracing::debug!(error = %message, "AWS dispatch failure");
            ProviderError::network("Network connection error - please check your internet")
        }
        SdkError::TimeoutError(_) => ProviderError::network("Request to AWS timed out"),
        _ => classify_aws_error(err.code(), &message),
    }
}

#[async_trait]
impl SpeechProviderPort for AwsPollyClient {
    fn capabilities(&self) -> &ProviderCapabilities {
        &self.caps
    }

    async fn list_regions(&self, _credentials: &Credentials) -> Result<Vec<Region>, ProviderError> {
        Ok(polly_regions::known_regions())
    }

    fn engines_for(&self, region: &Region) -> Vec<Engine> {
        polly_regions::engines_for(region)
    }

    async fn verify_credentials(&self, credentials: &Credentials) -> Result<(), ProviderError> {
        let config = self
            .sdk_config(credentials, &self.config.verify_region)
            .await;
        let sts = aws_sdk_sts::Client::new(&config);

        let identity = sts
            .get_caller_identity()
            .send()
            .await
            .map_err(map_sdk_error)?;

        tracing::info!(
            account = identity.account().unwrap_or("unknown"),
            "AWS credentials verified"
        );
        Ok(())
    }

    async fn discover_voices(
        &self,
        credentials: &Credentials,
        region: &Region,
        engine: Option<Engine>,
    ) -> Result<Vec<Voice>, ProviderError> {
        let client = self.polly(credentials, region).await;
        let mut voices = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = client.describe_voices();
            if let Some(engine) = engine {
                request = request.engine(Self::polly_engine(engine));
            }
            if let Some(token) = next_token.take() {
                request = request.next_token(token);
            }

            let response = request.send().await.map_err(map_sdk_error)?;
            voices.extend(response.voices().iter().filter_map(Self::to_voice));

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        tracing::debug!(
            region = %region,
            engine = ?engine,
            count = voices.len(),
            "Polly voices described"
        );
        Ok(voices)
    }

    async fn synthesize(
        &self,
        credentials: &Credentials,
        request: &SpeechRequest,
    ) -> Result<Vec<u8>, ProviderError> {
        let region = request
            .region
            .as_ref()
            .ok_or_else(|| ProviderError::provider("A region is required for Amazon Polly"))?;
        let client = self.polly(credentials, region).await;

        let mut call = client
            .synthesize_speech()
            .text(&request.text)
            .voice_id(VoiceId::from(request.voice_id.as_str()))
            .output_format(Self::polly_format(request.format)?)
            .sample_rate(request.sample_rate.to_string());
        if let Some(engine) = request.engine {
            call = call.engine(Self::polly_engine(engine));
        }

        let response = call.send().await.map_err(map_sdk_error)?;
        let bytes = response
            .audio_stream
            .collect()
            .await
            .map_err(|e| ProviderError::network(format!("Failed to read audio stream: {}", e)))?
            .into_bytes()
            .to_vec();

        tracing::debug!(
            region = %region,
            voice_id = %request.voice_id,
            bytes = bytes.len(),
            "Polly synthesis completed"
        );
        Ok(bytes)
    }
}

/// 凭据对的摘要，缓存 key 中不出现明文
fn credentials_fingerprint(credentials: &Credentials) -> String {
    let mut material = String::with_capacity(
        credentials.primary().len() + credentials.secondary().len() + 1,
    );
    material.push_str(credentials.primary());
    material.push('\n');
    material.push_str(credentials.secondary());
    let digest = md5::compute(material.as_bytes());
    material.zeroize();
    format!("{:x}", digest)
}

/// 客户端缓存 key: region + 凭据摘要
fn client_cache_key(fingerprint: &str, region: &Region) -> String {
    format!("{}:{}", region, fingerprint)
}
