//! OS shell shortcut collaborator.
//!
//! Shortcut and icon creation belongs to the host shell integration, not
//! the engine; the installer only drives this seam.

use skiff_core::SkiffResult;
use std::path::Path;
use tracing::debug;

pub trait ShortcutProvider: Send + Sync {
    fn create_shortcut(&self, executable: &Path) -> SkiffResult<()>;
}

/// Default provider: records the request and does nothing.
pub struct NoShortcuts;

impl ShortcutProvider for NoShortcuts {
    fn create_shortcut(&self, executable: &Path) -> SkiffResult<()> {
        debug!("Shortcut creation skipped for {}", executable.display());
        Ok(())
    }
}
