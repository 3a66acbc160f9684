//! Integration tests for the skiff CLI
//!
//! These tests drive the binary end-to-end: pack, releases, push, install
//! and update against temporary project and installation directories.
//! Unit tests for individual functions live in their source files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn skiff_command(project: &Path, config_home: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_skiff"));
    command.current_dir(project);
    // Keep the user's real config out of the tests.
    command.env("XDG_CONFIG_HOME", config_home);
    command.env("HOME", config_home);
    command
}

/// Lay out a buildable project: skiff.yaml, metadata template, artifacts
/// and a launcher blob for the host platform.
fn setup_project(temp: &TempDir, files: &[(&str, &str)]) -> (PathBuf, PathBuf) {
    let project = temp.path().join("project");
    fs::create_dir_all(&project).unwrap();

    let feed_dir = temp.path().join("feed");
    fs::create_dir_all(&feed_dir).unwrap();

    let os = std::env::consts::OS;
    fs::write(
        project.join("skiff.yaml"),
        format!(
            r#"id: demoapp
version: 0.0.0
target:
  os: {os}
  rid: {os}-x64
  metadata_template: release.template.yaml
channels:
  - name: test
    push_feed:
      url: {feed}
    update_feed:
      url: {feed}
    default: true
persistent_files:
  - settings.json
"#,
            os = os,
            feed = feed_dir.display()
        ),
    )
    .unwrap();

    fs::write(
        project.join("release.template.yaml"),
        "title: {{id}} {{version}}\nkind: {{kind}}\n",
    )
    .unwrap();

    let runners = project.join("runners").join(format!("{}-x64", os));
    fs::create_dir_all(&runners).unwrap();
    fs::write(runners.join("runner"), b"launcher-blob").unwrap();

    write_artifacts(&project, files);

    let config_home = temp.path().join("config-home");
    fs::create_dir_all(&config_home).unwrap();

    (project, config_home)
}

fn write_artifacts(project: &Path, files: &[(&str, &str)]) {
    let artifacts = project.join("artifacts");
    let _ = fs::remove_dir_all(&artifacts);
    fs::create_dir_all(&artifacts).unwrap();
    for (path, content) in files {
        let full = artifacts.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
}

fn pack(project: &Path, config_home: &Path, version: &str, force: bool) -> std::process::Output {
    let mut command = skiff_command(project, config_home);
    command
        .arg("pack")
        .arg("--app-id")
        .arg("demoapp")
        .arg("--version")
        .arg(version);
    if force {
        command.arg("--force");
    }
    command.output().unwrap()
}

#[test]
fn test_pack_builds_full_package() {
    let temp = TempDir::new().unwrap();
    let (project, config_home) = setup_project(&temp, &[("bin/demo", "exe"), ("data.txt", "d")]);

    let output = pack(&project, &config_home, "1.0.0", false);
    assert!(
        output.status.success(),
        "pack failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(project.join("packages/demoapp-1.0.0-full.skiff").exists());
}

#[test]
fn test_pack_same_version_requires_force() {
    let temp = TempDir::new().unwrap();
    let (project, config_home) = setup_project(&temp, &[("a.txt", "x")]);

    assert!(pack(&project, &config_home, "1.0.0", false).status.success());
    let rebuilt = pack(&project, &config_home, "1.0.0", false);
    assert!(!rebuilt.status.success());
    assert!(String::from_utf8_lossy(&rebuilt.stderr).contains("--force"));

    // The conscious overwrite goes through.
    assert!(pack(&project, &config_home, "1.0.0", true).status.success());
}

#[test]
fn test_pack_second_version_builds_delta() {
    let temp = TempDir::new().unwrap();
    let (project, config_home) =
        setup_project(&temp, &[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "c")]);

    assert!(pack(&project, &config_home, "1.0.0", false).status.success());

    // Change one file, add one file.
    write_artifacts(
        &project,
        &[
            ("a.txt", "a"),
            ("b.txt", "b CHANGED"),
            ("c.txt", "c"),
            ("d.txt", "d NEW"),
        ],
    );
    let output = pack(&project, &config_home, "1.0.1", false);
    assert!(
        output.status.success(),
        "pack failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(project.join("packages/demoapp-1.0.1-full.skiff").exists());
    assert!(project.join("packages/demoapp-1.0.1-delta.skiff").exists());
}

#[test]
fn test_pack_invalid_version_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let (project, config_home) = setup_project(&temp, &[("a.txt", "x")]);

    let output = pack(&project, &config_home, "not-a-version", false);
    assert!(!output.status.success());
    let packages = project.join("packages");
    assert!(
        !packages.exists() || fs::read_dir(&packages).unwrap().count() == 0,
        "validation failure must not write a package"
    );
}

#[test]
fn test_pack_missing_artifacts_dir_fails() {
    let temp = TempDir::new().unwrap();
    let (project, config_home) = setup_project(&temp, &[("a.txt", "x")]);
    fs::remove_dir_all(project.join("artifacts")).unwrap();

    let output = pack(&project, &config_home, "1.0.0", false);
    assert!(!output.status.success());
}

#[test]
fn test_releases_lists_built_packages() {
    let temp = TempDir::new().unwrap();
    let (project, config_home) = setup_project(&temp, &[("a.txt", "x")]);
    assert!(pack(&project, &config_home, "1.0.0", false).status.success());

    let output = skiff_command(&project, &config_home)
        .arg("releases")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("demoapp 1.0.0 [full]"));
}

#[test]
fn test_push_with_yes_lands_in_feed() {
    let temp = TempDir::new().unwrap();
    let (project, config_home) = setup_project(&temp, &[("a.txt", "x")]);
    assert!(pack(&project, &config_home, "1.0.0", false).status.success());

    let package = project.join("packages/demoapp-1.0.0-full.skiff");
    let output = skiff_command(&project, &config_home)
        .arg("push")
        .arg("--yes")
        .arg(&package)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "push failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(temp.path().join("feed/demoapp-1.0.0-full.skiff").exists());
}

#[test]
fn test_push_missing_package_fails_before_prompt() {
    let temp = TempDir::new().unwrap();
    let (project, config_home) = setup_project(&temp, &[("a.txt", "x")]);

    let output = skiff_command(&project, &config_home)
        .arg("push")
        .arg("--yes")
        .arg("packages/never-built.skiff")
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_install_then_update_via_cli() {
    let temp = TempDir::new().unwrap();
    let (project, config_home) =
        setup_project(&temp, &[("a.txt", "one"), ("settings.json", "{}")]);
    assert!(pack(&project, &config_home, "1.0.0", false).status.success());

    let root = temp.path().join("install-root");
    let install = skiff_command(&project, &config_home)
        .arg("install")
        .arg("--package")
        .arg(project.join("packages/demoapp-1.0.0-full.skiff"))
        .arg("--root")
        .arg(&root)
        .output()
        .unwrap();
    assert!(
        install.status.success(),
        "install failed: {}",
        String::from_utf8_lossy(&install.stderr)
    );
    assert!(root.join("packages/demoapp-1.0.0-full.skiff").exists());
    assert_eq!(fs::read(root.join("app-1.0.0/a.txt")).unwrap(), b"one");

    // User edits a persistent file, then updates via the delta.
    fs::write(root.join("app-1.0.0/settings.json"), "{\"edited\":1}").unwrap();
    write_artifacts(&project, &[("a.txt", "two"), ("settings.json", "{}")]);
    assert!(pack(&project, &config_home, "1.0.1", false).status.success());

    let update = skiff_command(&project, &config_home)
        .arg("update")
        .arg("--package")
        .arg(project.join("packages/demoapp-1.0.1-delta.skiff"))
        .arg("--root")
        .arg(&root)
        .output()
        .unwrap();
    assert!(
        update.status.success(),
        "update failed: {}",
        String::from_utf8_lossy(&update.stderr)
    );

    assert_eq!(fs::read(root.join("app-1.0.1/a.txt")).unwrap(), b"two");
    assert_eq!(
        fs::read(root.join("app-1.0.1/settings.json")).unwrap(),
        b"{\"edited\":1}"
    );
    // The previous version directory is untouched.
    assert_eq!(fs::read(root.join("app-1.0.0/a.txt")).unwrap(), b"one");
}

#[test]
fn test_install_corrupt_package_fails() {
    let temp = TempDir::new().unwrap();
    let (project, config_home) = setup_project(&temp, &[("a.txt", "x")]);

    let bogus = temp.path().join("bogus.skiff");
    fs::write(&bogus, "not an archive").unwrap();

    let output = skiff_command(&project, &config_home)
        .arg("install")
        .arg("--package")
        .arg(&bogus)
        .arg("--root")
        .arg(temp.path().join("root"))
        .output()
        .unwrap();
    assert!(!output.status.success());
}
