//! TTS Adapter - 语音服务商实现

mod aws_polly_client;
mod azure_speech_client;
mod fake_speech_client;
pub mod polly_regions;

pub use aws_polly_client::{classify_aws_error, AwsPollyClient, AwsPollyClientConfig};
pub use azure_speech_client::{
    build_ssml, normalize_endpoint, output_format_header, AzureSpeechClient,
    AzureSpeechClientConfig,
};
pub use fake_speech_client::{FakeSpeechProvider, FakeSpeechProviderConfig};
