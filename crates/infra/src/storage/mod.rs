//! Key-value backends for the credential store

pub mod file_store;
#[cfg(feature = "keychain")]
pub mod keychain;

use std::sync::Arc;

use lessonlink_core::{InMemoryKeyValueStore, KeyValueStore};
use lessonlink_domain::{Result, StorageBackend, StorageConfig};

pub use file_store::JsonFileStore;
#[cfg(feature = "keychain")]
pub use keychain::KeychainStore;

/// Open the backend selected by the storage configuration
///
/// # Errors
///
/// Returns `LessonLinkError::Storage` when the file store cannot be opened,
/// or `LessonLinkError::Config` when the keychain backend is selected but
/// the `keychain` feature is disabled.
pub fn open_backend(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryKeyValueStore::default())),
        StorageBackend::File => Ok(Arc::new(JsonFileStore::open(&config.path)?)),
        #[cfg(feature = "keychain")]
        StorageBackend::Keychain => Ok(Arc::new(KeychainStore::default())),
        #[cfg(not(feature = "keychain"))]
        StorageBackend::Keychain => Err(lessonlink_domain::LessonLinkError::Config(
            "keychain storage requires the `keychain` feature".to_string(),
        )),
    }
}
