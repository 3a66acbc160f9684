use crate::feed::Feed;
use crate::publish::{ConfirmGate, RetryPolicy};
use skiff_core::{Channel, CredentialStore, SkiffResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Terminal result of one package push after retries are exhausted.
#[derive(Debug)]
pub enum PushOutcome {
    Pushed { path: PathBuf },
    Failed { path: PathBuf, error: String },
}

impl PushOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            PushOutcome::Pushed { path } => path,
            PushOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PushOutcome::Pushed { .. })
    }
}

/// Result of a push batch: either the operator declined the gate (nothing
/// was attempted) or every package reached a terminal outcome.
#[derive(Debug)]
pub enum PushBatch {
    Declined,
    Completed(Vec<PushOutcome>),
}

/// Pushes built packages to a channel's feed with bounded parallelism and
/// per-package retry.
pub struct Publisher {
    feed: Arc<dyn Feed>,
    policy: RetryPolicy,
    max_parallel: Option<usize>,
}

impl Publisher {
    pub fn new(feed: Arc<dyn Feed>, policy: RetryPolicy) -> Self {
        Self {
            feed,
            policy,
            max_parallel: None,
        }
    }

    /// Override the parallelism cap (defaults to available parallelism)
    pub fn with_parallelism(mut self, max_parallel: usize) -> Self {
        self.max_parallel = Some(max_parallel.max(1));
        self
    }

    fn parallelism(&self, package_count: usize) -> usize {
        let hardware = self.max_parallel.unwrap_or_else(|| {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        });
        hardware.min(package_count).max(1)
    }

    /// Push a batch of packages to the channel's push feed.
    ///
    /// The confirm gate runs before any network call; declining aborts the
    /// whole batch with no side effects attempted.
    pub async fn push_packages(
        &self,
        packages: &[PathBuf],
        channel: &Channel,
        gate: &dyn ConfirmGate,
    ) -> SkiffResult<PushBatch> {
        if packages.is_empty() {
            return Ok(PushBatch::Completed(Vec::new()));
        }

        let api_key = match &channel.push_feed.api_key_name {
            Some(name) => Some(CredentialStore::retrieve(name)?),
            None => None,
        };

        let mut prompt = format!(
            "Push {} package(s) to channel '{}' ({})?",
            packages.len(),
            channel.name,
            self.feed.describe()
        );
        if channel.update_feed.has_credentials() {
            prompt.push_str(" The channel's update feed carries credentials.");
        }

        if !gate.confirm(&prompt)? {
            info!("Push to channel '{}' declined by operator", channel.name);
            return Ok(PushBatch::Declined);
        }

        let cap = self.parallelism(packages.len());
        info!(
            "Pushing {} package(s) to '{}' with parallelism {}",
            packages.len(),
            channel.name,
            cap
        );

        let mut outcomes = Vec::with_capacity(packages.len());
        let mut join_set = JoinSet::new();

        for package in packages {
            if join_set.len() >= cap {
                if let Some(Ok(outcome)) = join_set.join_next().await {
                    outcomes.push(outcome);
                }
            }

            let feed = Arc::clone(&self.feed);
            let policy = self.policy.clone();
            let package = package.clone();
            let api_key = api_key.clone();
            join_set.spawn(async move {
                Self::push_with_retry(feed, package, api_key, policy).await
            });
        }

        while let Some(result) = join_set.join_next().await {
            if let Ok(outcome) = result {
                outcomes.push(outcome);
            }
        }

        Ok(PushBatch::Completed(outcomes))
    }

    async fn push_with_retry(
        feed: Arc<dyn Feed>,
        package: PathBuf,
        api_key: Option<String>,
        policy: RetryPolicy,
    ) -> PushOutcome {
        let mut last_error = String::new();
        for attempt in 1..=policy.max_attempts.max(1) {
            match feed.push(&package, api_key.as_deref()).await {
                Ok(()) => {
                    info!("Pushed {}", package.display());
                    return PushOutcome::Pushed { path: package };
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        "Push attempt {}/{} for {} failed: {}",
                        attempt,
                        policy.max_attempts,
                        package.display(),
                        last_error
                    );
                    if attempt < policy.max_attempts {
                        tokio::time::sleep(policy.delay(attempt)).await;
                    }
                }
            }
        }

        PushOutcome::Failed {
            path: package,
            error: last_error,
        }
    }
}
