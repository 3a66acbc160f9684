//! Termination of processes running from inside an install root.
//!
//! Before an existing installation is replaced, anything still executing
//! from its directory tree is asked to stop. This is best effort: a
//! process that cannot be signalled is logged and the install proceeds.

use skiff_core::SkiffResult;
use std::path::Path;
use tracing::warn;

pub trait ProcessTerminator: Send + Sync {
    /// Terminate processes whose executable lives under `root`.
    /// Returns the number of processes signalled.
    fn terminate_under(&self, root: &Path) -> SkiffResult<usize>;
}

/// Terminates via the operating system's process table.
pub struct SystemProcesses;

#[cfg(target_os = "linux")]
impl ProcessTerminator for SystemProcesses {
    fn terminate_under(&self, root: &Path) -> SkiffResult<usize> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let mut signalled = 0;
        let proc_dir = match std::fs::read_dir("/proc") {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Cannot enumerate processes: {}", e);
                return Ok(0);
            }
        };

        for entry in proc_dir.filter_map(|e| e.ok()) {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.parse::<i32>().ok())
            else {
                continue;
            };

            let exe = match std::fs::read_link(entry.path().join("exe")) {
                Ok(exe) => exe,
                Err(_) => continue,
            };

            if exe.starts_with(root) {
                match kill(Pid::from_raw(pid), Signal::SIGTERM) {
                    Ok(()) => signalled += 1,
                    Err(e) => {
                        warn!("Cannot terminate pid {} ({}): {}", pid, exe.display(), e);
                    }
                }
            }
        }

        Ok(signalled)
    }
}

#[cfg(not(target_os = "linux"))]
impl ProcessTerminator for SystemProcesses {
    fn terminate_under(&self, root: &Path) -> SkiffResult<usize> {
        warn!(
            "Process termination under {} is not supported on this platform",
            root.display()
        );
        Ok(0)
    }
}

/// Does nothing. For callers that manage application lifecycle themselves.
pub struct NoProcesses;

impl ProcessTerminator for NoProcesses {
    fn terminate_under(&self, _root: &Path) -> SkiffResult<usize> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_processes_is_noop() {
        let temp = TempDir::new().unwrap();
        assert_eq!(NoProcesses.terminate_under(temp.path()).unwrap(), 0);
    }

    #[test]
    fn test_system_processes_empty_root() {
        // Nothing runs from a fresh temp directory.
        let temp = TempDir::new().unwrap();
        assert_eq!(SystemProcesses.terminate_under(temp.path()).unwrap(), 0);
    }
}
