use skiff::config::Config;
use skiff::core::{AppDescriptor, SkiffError, SkiffResult};
use skiff::feed::feed_for;
use skiff::publish::{AlwaysConfirm, ConfirmGate, PushBatch, Publisher};
use std::env;
use std::path::PathBuf;

/// Confirmation gate backed by an interactive terminal prompt.
struct DialoguerGate;

impl ConfirmGate for DialoguerGate {
    fn confirm(&self, prompt: &str) -> SkiffResult<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| SkiffError::Package(format!("Confirmation prompt failed: {}", e)))
    }
}

pub async fn run(
    packages: Vec<PathBuf>,
    channel: Option<String>,
    yes: bool,
) -> SkiffResult<()> {
    let working = env::current_dir()
        .map_err(|e| SkiffError::Path(format!("Failed to get current directory: {}", e)))?;
    let config = Config::load()?;
    let descriptor = AppDescriptor::load(&working)?;

    let channel = match &channel {
        Some(name) => descriptor.channel(name).ok_or_else(|| {
            SkiffError::Validation(format!(
                "Channel '{}' is not declared for '{}'",
                name, descriptor.id
            ))
        })?,
        None => descriptor.default_channel(),
    };

    if packages.is_empty() {
        return Err(SkiffError::Validation(
            "No packages given to push".to_string(),
        ));
    }
    for package in &packages {
        if !package.is_file() {
            return Err(SkiffError::Validation(format!(
                "Package not found: {}",
                package.display()
            )));
        }
    }

    let feed = feed_for(&channel.push_feed)?;
    let publisher = Publisher::new(feed, config.retry.clone());
    let gate: Box<dyn ConfirmGate> = if yes || config.assume_yes {
        Box::new(AlwaysConfirm)
    } else {
        Box::new(DialoguerGate)
    };

    match publisher
        .push_packages(&packages, channel, gate.as_ref())
        .await?
    {
        PushBatch::Declined => {
            println!("Push aborted; nothing was published.");
            Ok(())
        }
        PushBatch::Completed(outcomes) => {
            let mut failures = 0;
            for outcome in &outcomes {
                match outcome {
                    skiff::publish::PushOutcome::Pushed { path } => {
                        println!("✓ Pushed {}", path.display());
                    }
                    skiff::publish::PushOutcome::Failed { path, error } => {
                        println!("✗ Failed {}: {}", path.display(), error);
                        failures += 1;
                    }
                }
            }
            if failures > 0 {
                return Err(SkiffError::Feed(format!(
                    "{} of {} package(s) failed to push",
                    failures,
                    outcomes.len()
                )));
            }
            Ok(())
        }
    }
}
