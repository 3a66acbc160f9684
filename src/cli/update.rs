use skiff::config::Config;
use skiff::core::SkiffResult;
use skiff::install::Installer;
use std::path::PathBuf;

pub async fn run(package: PathBuf, root: PathBuf) -> SkiffResult<()> {
    let config = Config::load()?;
    let installer = Installer::new().with_hook_timeout(config.hook_timeout());

    println!("Updating {} from {}", root.display(), package.display());
    let installed = installer.update(&package, &root).await?;

    println!(
        "✓ Updated {} to {} ({})",
        installed.id,
        installed.version,
        installed.version_dir.display()
    );
    Ok(())
}
