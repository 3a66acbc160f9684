pub mod hooks;
pub mod installer;
pub mod processes;
pub mod shortcuts;

pub use hooks::{find_aware_executables, is_update_aware, HookOutcome, AWARE_MARKER};
pub use installer::{InstalledApp, Installer, DEFAULT_HOOK_TIMEOUT};
pub use processes::{NoProcesses, ProcessTerminator, SystemProcesses};
pub use shortcuts::{NoShortcuts, ShortcutProvider};
