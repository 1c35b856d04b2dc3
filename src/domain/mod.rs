//! Domain Layer - 领域层
//!
//! - Voice Context: 音色 / 语言 / 引擎 / 格式等值对象
//! - Provider Context: 服务商能力描述
//! - Selection: 用户选择状态
//! - Credentials: 服务商凭据

pub mod credentials;
pub mod provider;
pub mod selection;
pub mod voice;

pub use credentials::Credentials;
pub use provider::{DiscoveryShape, ProviderCapabilities, ProviderKind};
pub use selection::{Field, Selection};
