//! Secret Store Port - 安全凭据存储
//!
//! 按 (service, key) 存取字符串密钥，后端是不透明的 KV 存储（系统钥匙串等）

use async_trait::async_trait;
use thiserror::Error;

/// 密钥存储错误
#[derive(Debug, Clone, Error)]
pub enum SecretStoreError {
    #[error("Secret store unavailable: {0}")]
    Unavailable(String),

    #[error("Access to secret store denied")]
    AccessDenied,

    #[error("Secret store error: {0}")]
    Internal(String),
}

/// Secret Store Port
#[async_trait]
pub trait SecretStorePort: Send + Sync {
    /// 读取密钥，不存在时返回 `Ok(None)`
    async fn get(&self, service: &str, key: &str) -> Result<Option<String>, SecretStoreError>;

    /// 写入密钥
    async fn set(&self, service: &str, key: &str, value: &str) -> Result<(), SecretStoreError>;

    /// 删除密钥（不存在视为成功）
    async fn delete(&self, service: &str, key: &str) -> Result<(), SecretStoreError>;
}
