use skiff::core::{CredentialStore, SkiffError, SkiffResult};

pub fn run(feed: String) -> SkiffResult<()> {
    let api_key: String = dialoguer::Password::new()
        .with_prompt(format!("API key for '{}'", feed))
        .interact()
        .map_err(|e| SkiffError::Credential(format!("Prompt failed: {}", e)))?;

    if api_key.trim().is_empty() {
        return Err(SkiffError::Validation("API key cannot be empty".to_string()));
    }

    CredentialStore::store(&feed, api_key.trim())?;
    println!("✓ Stored credential '{}' in the OS keychain", feed);
    Ok(())
}
