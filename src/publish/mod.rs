use serde::{Deserialize, Serialize};
use skiff_core::SkiffResult;
use std::time::Duration;

pub mod publisher;

pub use publisher::{PushBatch, PushOutcome, Publisher};

/// Bounded retry for transient push failures. The exact policy is a
/// configuration concern, not a correctness one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_exponential")]
    pub exponential: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_exponential() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            exponential: default_exponential(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given 1-based failed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let ms = if self.exponential {
            self.backoff_ms
                .saturating_mul(1u64 << attempt.saturating_sub(1).min(16))
        } else {
            self.backoff_ms
        };
        Duration::from_millis(ms)
    }
}

/// The human-in-the-loop checkpoint in front of any publish. Declining is
/// an orderly abort, not an error.
pub trait ConfirmGate: Send + Sync {
    fn confirm(&self, prompt: &str) -> SkiffResult<bool>;
}

/// Answers yes without prompting (`--yes`, non-interactive runs, tests).
pub struct AlwaysConfirm;

impl ConfirmGate for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> SkiffResult<bool> {
        Ok(true)
    }
}
