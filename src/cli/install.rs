use skiff::config::Config;
use skiff::core::SkiffResult;
use skiff::install::Installer;
use std::path::PathBuf;

pub async fn run(package: PathBuf, root: PathBuf) -> SkiffResult<()> {
    let config = Config::load()?;
    let installer = Installer::new().with_hook_timeout(config.hook_timeout());

    println!("Installing {} into {}", package.display(), root.display());
    let installed = installer.install(&package, &root).await?;

    println!(
        "✓ Installed {}@{} ({})",
        installed.id,
        installed.version,
        installed.version_dir.display()
    );
    if !installed.hook_results.is_empty() {
        println!("  {} hook invocation(s) ran", installed.hook_results.len());
    }
    Ok(())
}
