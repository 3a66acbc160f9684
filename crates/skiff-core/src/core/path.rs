use crate::core::error::{SkiffError, SkiffResult};
use crate::core::version::Version;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the skiff home directory
///
/// Platform-specific locations:
/// - Windows: %APPDATA%\skiff
/// - Linux: ~/.config/skiff
/// - macOS: ~/Library/Application Support/skiff
pub fn skiff_home() -> SkiffResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| SkiffError::Path("Could not determine config directory".to_string()))?;
    Ok(config_dir.join("skiff"))
}

/// Get the config file path (`<skiff home>/config.yaml`)
pub fn config_file() -> SkiffResult<PathBuf> {
    Ok(skiff_home()?.join("config.yaml"))
}

/// Resolve a possibly-relative path against a working directory.
pub fn resolve_dir(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Default packages directory for a build workspace (`<working dir>/packages`)
pub fn packages_dir(working_dir: &Path) -> PathBuf {
    working_dir.join("packages")
}

/// Default artifacts directory for a build workspace (`<working dir>/artifacts`)
pub fn artifacts_dir(working_dir: &Path) -> PathBuf {
    working_dir.join("artifacts")
}

/// Packages cache inside an installation root (`<root>/packages`)
pub fn packages_cache_dir(root: &Path) -> PathBuf {
    root.join("packages")
}

/// Version directory inside an installation root (`<root>/app-<version>`)
pub fn version_dir(root: &Path, version: &Version) -> PathBuf {
    root.join(format!("app-{}", version))
}

/// Create a directory (and parents) if it doesn't exist
pub fn ensure_dir(path: &Path) -> SkiffResult<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_dir_relative() {
        let working = Path::new("/work");
        assert_eq!(
            resolve_dir(working, Path::new("artifacts")),
            PathBuf::from("/work/artifacts")
        );
    }

    #[test]
    fn test_resolve_dir_absolute() {
        let working = Path::new("/work");
        assert_eq!(
            resolve_dir(working, Path::new("/elsewhere")),
            PathBuf::from("/elsewhere")
        );
    }

    #[test]
    fn test_version_dir_name() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(
            version_dir(Path::new("/opt/demo"), &v),
            PathBuf::from("/opt/demo/app-1.2.3")
        );
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Idempotent
        ensure_dir(&nested).unwrap();
    }
}
