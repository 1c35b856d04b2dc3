//! Credential Manager - 凭据生命周期
//!
//! 凭据持久化是尽力而为的：密钥存储失败只记录日志并返回失败，
//! 不会清除已验证的内存凭据，也不会中断不依赖存储的流程

use std::sync::Arc;

use crate::application::ports::SecretStorePort;
use crate::domain::{Credentials, ProviderKind};

/// 保存结果（三态）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// 已写入密钥存储
    Saved,
    /// 用户未勾选"记住"，无需写入
    NotRequested,
    /// 写入失败，内存凭据仍然有效
    Failed(String),
}

impl SaveOutcome {
    /// "无事可做"也算成功
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// 单个服务商的凭据管理器
pub struct CredentialManager {
    kind: ProviderKind,
    store: Arc<dyn SecretStorePort>,
    current: Option<Credentials>,
}

impl CredentialManager {
    pub fn new(kind: ProviderKind, store: Arc<dyn SecretStorePort>) -> Self {
        Self {
            kind,
            store,
            current: None,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// 当前内存凭据
    pub fn current(&self) -> Option<&Credentials> {
        self.current.as_ref()
    }

    pub fn set(&mut self, credentials: Credentials) {
        self.current = Some(credentials);
    }

    /// 从密钥存储加载，两个字段都存在时返回 true
    pub async fn load(&mut self) -> bool {
        match self.read_pair().await {
            Some(credentials) => {
                tracing::info!(provider = %self.kind, "Loaded saved credentials");
                self.current = Some(credentials);
                true
            }
            None => {
                tracing::debug!(provider = %self.kind, "No saved credentials");
                false
            }
        }
    }

    /// 保存当前凭据；remember 为 false 时不访问密钥存储
    pub async fn save(&self, remember: bool) -> SaveOutcome {
        if !remember {
            return SaveOutcome::NotRequested;
        }
        let Some(credentials) = &self.current else {
            return SaveOutcome::Failed("No credentials to save".to_string());
        };

        let service = self.kind.secret_service();
        let [primary_key, secondary_key] = self.kind.secret_keys();

        // 写入副字段失败时用它恢复主字段，保证存储中不会出现新旧混合的凭据
        let previous_primary = match self.store.get(service, primary_key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    provider = %self.kind,
                    service,
                    error = %e,
                    "Failed to save credentials"
                );
                return SaveOutcome::Failed(e.to_string());
            }
        };

        let result = match self
            .store
            .set(service, primary_key, credentials.primary())
            .await
        {
            Ok(()) => {
                let written = self
                    .store
                    .set(service, secondary_key, credentials.secondary())
                    .await;
                if written.is_err() {
                    self.rollback_primary(previous_primary.as_deref()).await;
                }
                written
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(provider = %self.kind, service, "Credentials saved");
                SaveOutcome::Saved
            }
            Err(e) => {
                tracing::warn!(
                    provider = %self.kind,
                    service,
                    error = %e,
                    "Failed to save credentials"
                );
                SaveOutcome::Failed(e.to_string())
            }
        }
    }

    /// 恢复写入前的主字段；恢复不了就删掉整对凭据
    async fn rollback_primary(&self, previous: Option<&str>) {
        let service = self.kind.secret_service();
        let [primary_key, secondary_key] = self.kind.secret_keys();

        let restored = match previous {
            Some(value) => self.store.set(service, primary_key, value).await,
            None => self.store.delete(service, primary_key).await,
        };
        if restored.is_ok() {
            tracing::debug!(provider = %self.kind, service, "Rolled back partial credential save");
            return;
        }

        tracing::warn!(
            provider = %self.kind,
            service,
            "Could not restore previous credentials, removing saved pair"
        );
        for key in [primary_key, secondary_key] {
            if let Err(e) = self.store.delete(service, key).await {
                tracing::warn!(provider = %self.kind, service, key, error = %e, "Failed to delete saved credential");
            }
        }
    }

    /// 密钥存储中是否已有完整凭据
    pub async fn has_saved(&self) -> bool {
        self.read_pair().await.is_some()
    }

    /// 删除已保存的凭据并清空内存字段
    pub async fn clear(&mut self) -> bool {
        self.current = None;

        let service = self.kind.secret_service();
        let mut ok = true;
        for key in self.kind.secret_keys() {
            if let Err(e) = self.store.delete(service, key).await {
                tracing::warn!(
                    provider = %self.kind,
                    service,
                    key,
                    error = %e,
                    "Failed to delete saved credential"
                );
                ok = false;
            }
        }

        if ok {
            tracing::info!(provider = %self.kind, "Saved credentials cleared");
        }
        ok
    }

    async fn read_pair(&self) -> Option<Credentials> {
        let [primary_key, secondary_key] = self.kind.secret_keys();
        let primary = self.read_secret(primary_key).await?;
        let secondary = self.read_secret(secondary_key).await?;
        Some(Credentials::new(primary, secondary))
    }

    async fn read_secret(&self, key: &str) -> Option<String> {
        let service = self.kind.secret_service();
        match self.store.get(service, key).await {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                tracing::warn!(
                    provider = %self.kind,
                    service,
                    key,
                    error = %e,
                    "Failed to read saved credential"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::InMemorySecretStore;

    fn manager(store: &Arc<InMemorySecretStore>) -> CredentialManager {
        CredentialManager::new(ProviderKind::Polly, store.clone())
    }

    #[tokio::test]
    async fn test_load_without_saved_credentials() {
        let store = Arc::new(InMemorySecretStore::new());
        let mut manager = manager(&store);

        assert!(!manager.load().await);
        assert!(manager.current().is_none());
        assert!(!manager.has_saved().await);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = Arc::new(InMemorySecretStore::new());
        let mut writer = manager(&store);
        writer.set(Credentials::new("AKIDEXAMPLE", "secret"));
        assert_eq!(writer.save(true).await, SaveOutcome::Saved);

        let mut reader = manager(&store);
        assert!(reader.load().await);
        assert_eq!(reader.current().unwrap().primary(), "AKIDEXAMPLE");
        assert!(reader.has_saved().await);
    }

    #[tokio::test]
    async fn test_save_without_remember_skips_store() {
        let store = Arc::new(InMemorySecretStore::new());
        store.set_failing(true);
        let mut manager = manager(&store);
        manager.set(Credentials::new("id", "secret"));

        let outcome = manager.save(false).await;
        assert_eq!(outcome, SaveOutcome::NotRequested);
        assert!(outcome.is_success());
        assert_eq!(store.operation_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_session() {
        let store = Arc::new(InMemorySecretStore::new());
        store.set_failing(true);
        let mut manager = manager(&store);
        manager.set(Credentials::new("id", "secret"));

        let outcome = manager.save(true).await;
        assert!(matches!(outcome, SaveOutcome::Failed(_)));
        assert!(!outcome.is_success());
        assert!(manager.current().is_some());
    }

    #[tokio::test]
    async fn test_partial_pair_is_not_loaded() {
        let store = Arc::new(InMemorySecretStore::new());
        store.set("aws_tts_app", "access_key_id", "id").await.unwrap();
        let mut manager = manager(&store);

        assert!(!manager.load().await);
    }

    #[tokio::test]
    async fn test_clear_removes_store_and_memory() {
        let store = Arc::new(InMemorySecretStore::new());
        let mut manager = manager(&store);
        manager.set(Credentials::new("id", "secret"));
        manager.save(true).await;

        assert!(manager.clear().await);
        assert!(manager.current().is_none());
        assert!(!manager.has_saved().await);
        // 重复删除也成功
        assert!(manager.clear().await);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = Arc::new(InMemorySecretStore::new());
        let mut polly = manager(&store);
        polly.set(Credentials::new("id", "secret"));
        polly.save(true).await;

        let mut azure = CredentialManager::new(ProviderKind::Azure, store.clone());
        assert!(!azure.load().await);
    }

    #[tokio::test]
    async fn test_failed_secondary_write_restores_previous_pair() {
        let store = Arc::new(InMemorySecretStore::new());
        let mut first = manager(&store);
        first.set(Credentials::new("OLDKEY", "oldsecret"));
        assert_eq!(first.save(true).await, SaveOutcome::Saved);

        store.fail_writes_to("secret_access_key");
        let mut second = manager(&store);
        second.set(Credentials::new("NEWKEY", "newsecret"));
        assert!(matches!(second.save(true).await, SaveOutcome::Failed(_)));
        assert_eq!(second.current().unwrap().primary(), "NEWKEY");

        let mut reader = manager(&store);
        assert!(reader.load().await);
        let loaded = reader.current().unwrap();
        assert_eq!(loaded.primary(), "OLDKEY");
        assert_eq!(loaded.secondary(), "oldsecret");
    }

    #[tokio::test]
    async fn test_failed_secondary_write_without_previous_pair_leaves_nothing() {
        let store = Arc::new(InMemorySecretStore::new());
        store.fail_writes_to("secret_access_key");
        let mut manager = manager(&store);
        manager.set(Credentials::new("NEWKEY", "newsecret"));

        assert!(matches!(manager.save(true).await, SaveOutcome::Failed(_)));
        assert!(store.is_empty());
        assert!(!manager.has_saved().await);
    }
}
