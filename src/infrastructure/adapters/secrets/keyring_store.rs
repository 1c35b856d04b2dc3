//! Keyring Secret Store - 系统密钥链存储
//!
//! 使用 `keyring` crate 访问 macOS Keychain / Windows Credential Manager /
//! Linux keyutils。keyring 调用是阻塞的，统一放到 spawn_blocking 中执行

use async_trait::async_trait;
use keyring::Entry;

use crate::application::ports::{SecretStoreError, SecretStorePort};

/// 系统密钥链
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringSecretStore;

impl KeyringSecretStore {
    pub fn new() -> Self {
        Self
    }

    /// keyring 错误映射
    fn map_error(error: keyring::Error) -> SecretStoreError {
        match error {
            keyring::Error::NoStorageAccess(platform_err) => {
                let err_str = platform_err.to_string().to_lowercase();
                if err_str.contains("denied") || err_str.contains("permission") {
                    SecretStoreError::AccessDenied
                } else {
                    SecretStoreError::Unavailable(platform_err.to_string())
                }
            }
            keyring::Error::PlatformFailure(platform_err) => {
                let err_str = platform_err.to_string().to_lowercase();
                if err_str.contains("authorization") || err_str.contains("denied") {
                    SecretStoreError::AccessDenied
                } else {
                    SecretStoreError::Unavailable(platform_err.to_string())
                }
            }
            keyring::Error::Ambiguous(_) => {
                SecretStoreError::Internal("Ambiguous keyring entry".to_string())
            }
            other => SecretStoreError::Internal(other.to_string()),
        }
    }

    async fn run<T, F>(task: F) -> Result<T, SecretStoreError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, SecretStoreError> + Send + 'static,
    {
        match tokio::task::spawn_blocking(task).await {
            Ok(result) => result,
            Err(e) => Err(SecretStoreError::Internal(format!(
                "Keyring task failed: {e}"
            ))),
        }
    }
}

#[async_trait]
impl SecretStorePort for KeyringSecretStore {
    async fn get(&self, service: &str, key: &str) -> Result<Option<String>, SecretStoreError> {
        let (service, key) = (service.to_string(), key.to_string());
        Self::run(move || {
            let entry = Entry::new(&service, &key).map_err(Self::map_error)?;
            match entry.get_password() {
                // 空字符串视为未设置
                Ok(password) if password.is_empty() => Ok(None),
                Ok(password) => Ok(Some(password)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(Self::map_error(e)),
            }
        })
        .await
    }

    async fn set(&self, service: &str, key: &str, value: &str) -> Result<(), SecretStoreError> {
        let (service, key, value) = (service.to_string(), key.to_string(), value.to_string());
        Self::run(move || {
            let entry = Entry::new(&service, &key).map_err(Self::map_error)?;
            entry.set_password(&value).map_err(Self::map_error)
        })
        .await
    }

    async fn delete(&self, service: &str, key: &str) -> Result<(), SecretStoreError> {
        let (service, key) = (service.to_string(), key.to_string());
        Self::run(move || {
            let entry = Entry::new(&service, &key).map_err(Self::map_error)?;
            match entry.delete_password() {
                Ok(()) => Ok(()),
                // 删除是幂等的
                Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(Self::map_error(e)),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_no_storage_access() {
        let err = KeyringSecretStore::map_error(keyring::Error::NoStorageAccess(
            "permission denied by user".into(),
        ));
        assert!(matches!(err, SecretStoreError::AccessDenied));

        let err = KeyringSecretStore::map_error(keyring::Error::NoStorageAccess(
            "dbus session not running".into(),
        ));
        assert!(matches!(err, SecretStoreError::Unavailable(_)));
    }

    #[test]
    fn test_map_other_errors() {
        let err = KeyringSecretStore::map_error(keyring::Error::TooLong("password".into(), 10));
        assert!(matches!(err, SecretStoreError::Internal(_)));
    }
}
