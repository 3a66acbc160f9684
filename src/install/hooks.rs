//! Post-install application hooks.
//!
//! An application binary opts into lifecycle invocations by embedding a
//! fixed marker byte sequence at build time. Discovery scans file content
//! for that marker, so it works for any executable format. Hooks run one
//! at a time; a hook that fails or exceeds its timeout is logged and
//! skipped, never aborting the install or update.

use skiff_core::SkiffResult;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Marker embedded by application build tooling to opt into lifecycle hooks
pub const AWARE_MARKER: &[u8] = b"skiff-aware:1";

/// Terminal state of one hook invocation
#[derive(Debug, PartialEq, Eq)]
pub enum HookOutcome {
    Completed,
    Failed(String),
    TimedOut,
    Skipped,
}

/// Whether a file opts into lifecycle hooks, by scanning its content for
/// the marker. Reads in chunks with an overlap so the marker is found
/// across chunk boundaries.
pub fn is_update_aware(path: &Path) -> SkiffResult<bool> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let overlap = AWARE_MARKER.len() - 1;
    let mut buf = vec![0u8; 64 * 1024];
    let mut carry: Vec<u8> = Vec::new();

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(false);
        }

        let mut window = carry.clone();
        window.extend_from_slice(&buf[..n]);
        if window
            .windows(AWARE_MARKER.len())
            .any(|w| w == AWARE_MARKER)
        {
            return Ok(true);
        }

        let start = window.len().saturating_sub(overlap);
        carry = window[start..].to_vec();
    }
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match path.metadata() {
            Ok(meta) => meta.permissions().mode() & 0o111 != 0,
            Err(_) => false,
        }
    }
    #[cfg(not(unix))]
    {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("exe"))
            .unwrap_or(false)
    }
}

/// Find all update-aware executables under a directory, in lexicographic
/// order so invocation order is deterministic. Unreadable files are
/// skipped with a warning.
pub fn find_aware_executables(dir: &Path) -> Vec<PathBuf> {
    let mut executables = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_executable(entry.path()) {
            continue;
        }
        match is_update_aware(entry.path()) {
            Ok(true) => executables.push(entry.path().to_path_buf()),
            Ok(false) => {}
            Err(e) => {
                warn!("Cannot inspect {}: {}", entry.path().display(), e);
            }
        }
    }
    executables
}

/// Invoke one executable with the given arguments under a hard timeout.
/// A process still running at the deadline is killed.
pub async fn run_hook(executable: &Path, args: &[String], timeout: Duration) -> HookOutcome {
    debug!("Invoking hook {} {:?}", executable.display(), args);

    let mut command = tokio::process::Command::new(executable);
    command.args(args);
    if let Some(dir) = executable.parent() {
        command.current_dir(dir);
    }
    command.stdin(std::process::Stdio::null());
    command.kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => return HookOutcome::Failed(format!("spawn failed: {}", e)),
    };

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) if status.success() => HookOutcome::Completed,
        Ok(Ok(status)) => HookOutcome::Failed(format!("exited with {}", status)),
        Ok(Err(e)) => HookOutcome::Failed(format!("wait failed: {}", e)),
        Err(_) => {
            let _ = child.kill().await;
            HookOutcome::TimedOut
        }
    }
}

/// Run a lifecycle hook against each executable, strictly one at a time.
/// Failures and timeouts are logged and skipped; cancellation stops
/// starting new hooks but does not interrupt the one in flight.
pub async fn run_hooks(
    executables: &[PathBuf],
    args: &[String],
    timeout: Duration,
    cancel: &CancellationToken,
) -> Vec<(PathBuf, HookOutcome)> {
    let mut results = Vec::with_capacity(executables.len());

    for executable in executables {
        if cancel.is_cancelled() {
            results.push((executable.clone(), HookOutcome::Skipped));
            continue;
        }

        let outcome = run_hook(executable, args, timeout).await;
        match &outcome {
            HookOutcome::Completed => {}
            HookOutcome::Failed(reason) => {
                warn!("Hook {} failed: {}", executable.display(), reason);
            }
            HookOutcome::TimedOut => {
                warn!(
                    "Hook {} exceeded its {}s timeout and was cancelled",
                    executable.display(),
                    timeout.as_secs()
                );
            }
            HookOutcome::Skipped => {}
        }
        results.push((executable.clone(), outcome));
    }

    results
}
