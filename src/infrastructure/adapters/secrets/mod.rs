//! Secret Store Adapter - 凭据存储实现

mod keyring_store;
mod memory_store;

pub use keyring_store::KeyringSecretStore;
pub use memory_store::InMemorySecretStore;
