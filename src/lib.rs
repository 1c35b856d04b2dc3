//! Voxdesk - 多服务商桌面 TTS 客户端核心
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Voice Context: 区域、引擎、语言、音色、格式、采样率
//! - Provider Context: 服务商能力描述（Amazon Polly / Azure Speech）
//! - Selection / Credentials
//!
//! 应用层 (application/):
//! - Ports: 端口定义（SpeechProvider, SecretStore, AudioStorage, AudioTranscoder, ShellAction）
//! - Catalog / Selection / Synthesis / Credentials: 核心用例
//! - Session: 单个服务商标签页的流程编排
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: AWS Polly、Azure Speech、系统密钥链、文件存储、WAV 封装、系统 Shell

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
