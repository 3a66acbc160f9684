use crate::publish::RetryPolicy;
use serde::{Deserialize, Serialize};
use skiff_core::core::path::{config_file, ensure_dir};
use skiff_core::{SkiffError, SkiffResult};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Packages directory override (defaults to `<working dir>/packages`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages_dir: Option<String>,

    /// Directory holding prebuilt launcher binaries, one subdirectory per
    /// `<os>-<arch>` (defaults to `<working dir>/runners`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launchers_dir: Option<String>,

    /// Per-invocation timeout for post-install hooks, in seconds
    #[serde(default = "default_hook_timeout_secs")]
    pub hook_timeout_secs: u64,

    /// Retry policy for transient push failures
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Answer yes to confirmation prompts (non-interactive runs)
    #[serde(default)]
    pub assume_yes: bool,
}

fn default_hook_timeout_secs() -> u64 {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            packages_dir: None,
            launchers_dir: None,
            hook_timeout_secs: default_hook_timeout_secs(),
            retry: RetryPolicy::default(),
            assume_yes: false,
        }
    }
}

impl Config {
    /// Load config from the platform config directory, creating a default
    /// one if it doesn't exist
    ///
    /// Config locations:
    /// - Windows: %APPDATA%\skiff\config.yaml
    /// - Linux: ~/.config/skiff/config.yaml
    /// - macOS: ~/Library/Application Support/skiff/config.yaml
    pub fn load() -> SkiffResult<Self> {
        let config_path = config_file()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| SkiffError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save config to the platform config directory
    pub fn save(&self) -> SkiffResult<()> {
        let config_path = config_file()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| SkiffError::Config("Config path has no parent".to_string()))?;

        ensure_dir(config_dir)?;

        let content = serde_yaml::to_string(self)
            .map_err(|e| SkiffError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn hook_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.hook_timeout_secs)
    }
}
