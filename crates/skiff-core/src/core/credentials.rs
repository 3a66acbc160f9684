use crate::core::{SkiffError, SkiffResult};
use keyring::Entry;

/// Service name for keyring entries
const KEYRING_SERVICE: &str = "skiff";

/// Manages feed credential storage using the OS keychain
///
/// Platform support:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
pub struct CredentialStore;

impl CredentialStore {
    /// Store a credential in the OS keychain
    pub fn store(key: &str, value: &str) -> SkiffResult<()> {
        let entry = Entry::new(KEYRING_SERVICE, key)
            .map_err(|e| SkiffError::Credential(format!("Failed to create keyring entry: {}", e)))?;

        entry.set_password(value).map_err(|e| {
            SkiffError::Credential(format!("Failed to store credential in keychain: {}", e))
        })?;

        Ok(())
    }

    /// Retrieve a credential from the OS keychain
    pub fn retrieve(key: &str) -> SkiffResult<String> {
        let entry = Entry::new(KEYRING_SERVICE, key)
            .map_err(|e| SkiffError::Credential(format!("Failed to create keyring entry: {}", e)))?;

        let password = entry.get_password().map_err(|e| {
            SkiffError::Credential(format!("Failed to retrieve credential from keychain: {}", e))
        })?;

        Ok(password)
    }

    /// Delete a credential from the OS keychain
    pub fn delete(key: &str) -> SkiffResult<()> {
        let entry = Entry::new(KEYRING_SERVICE, key)
            .map_err(|e| SkiffError::Credential(format!("Failed to create keyring entry: {}", e)))?;

        entry.delete_credential().map_err(|e| {
            SkiffError::Credential(format!("Failed to delete credential from keychain: {}", e))
        })?;

        Ok(())
    }

    /// Check if a credential exists in the keychain
    pub fn exists(key: &str) -> bool {
        Self::retrieve(key).is_ok()
    }
}
