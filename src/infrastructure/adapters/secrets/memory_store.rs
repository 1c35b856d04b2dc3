//! In-Memory Secret Store - 内存密钥存储
//!
//! 用于测试；可切换为失败模式以模拟密钥链不可用

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::application::ports::{SecretStoreError, SecretStorePort};

/// 内存密钥存储
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    /// (service, key) → value
    entries: DashMap<(String, String), String>,
    failing: AtomicBool,
    /// 写入会失败的键
    failing_keys: DashSet<String>,
    operations: AtomicUsize,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开启后所有操作返回 Unavailable
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 之后对该键的 set 返回 Unavailable，其他操作不受影响
    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys.insert(key.to_string());
    }

    /// 已执行的操作次数（含失败）
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check(&self) -> Result<(), SecretStoreError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SecretStoreError::Unavailable(
                "in-memory store is in failing mode".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStorePort for InMemorySecretStore {
    async fn get(&self, service: &str, key: &str) -> Result<Option<String>, SecretStoreError> {
        self.check()?;
        Ok(self
            .entries
            .get(&(service.to_string(), key.to_string()))
            .map(|v| v.value().clone()))
    }

    async fn set(&self, service: &str, key: &str, value: &str) -> Result<(), SecretStoreError> {
        self.check()?;
        if self.failing_keys.contains(key) {
            return Err(SecretStoreError::Unavailable(format!(
                "writes to {} are failing",
                key
            )));
        }
        self.entries
            .insert((service.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete(&self, service: &str, key: &str) -> Result<(), SecretStoreError> {
        self.check()?;
        self.entries.remove(&(service.to_string(), key.to_string()));
        Ok(())
    }
}
