//! Common test utilities for binpm integration tests
//!
//! [`TestEnv`] lays out an isolated binpm home (cache, registry, config),
//! `file://` remotes and a project folder for graph and workspace files.

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

use binpm::cache::layout;
use binpm::model::{FileTreeManifest, PackageInfo};
use binpm::reference::{PackageReference, RecipeReference};

/// Isolated binpm environment.
pub struct TestEnv {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    home: PathBuf,
    remotes_dir: PathBuf,
    project_dir: PathBuf,
}

impl TestEnv {
    /// Create the home, remotes and project folders.
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let home = temp_dir.path().join("home");
        let remotes_dir = temp_dir.path().join("remotes");
        let project_dir = temp_dir.path().join("project");

        fs::create_dir_all(&home).await?;
        fs::create_dir_all(&remotes_dir).await?;
        fs::create_dir_all(&project_dir).await?;

        Ok(Self {
            _temp_dir: temp_dir,
            home,
            remotes_dir,
            project_dir,
        })
    }

    /// binpm home folder (`BINPM_HOME`).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Package cache root under the default configuration.
    pub fn storage_path(&self) -> PathBuf {
        self.home.join("data")
    }

    /// Registry file under the default configuration.
    pub fn registry_path(&self) -> PathBuf {
        self.home.join("registry.json")
    }

    pub fn project_path(&self) -> &Path {
        &self.project_dir
    }

    /// Folder served by the `file://` remote `name`.
    pub fn remote_dir(&self, name: &str) -> PathBuf {
        self.remotes_dir.join(name)
    }

    /// `file://` URL of the remote `name`, creating its folder.
    pub async fn create_remote(&self, name: &str) -> Result<String> {
        let dir = self.remote_dir(name);
        fs::create_dir_all(&dir).await?;
        Ok(path_to_file_url(&dir))
    }

    /// Publish a binary package to the remote `name`.
    pub async fn publish(
        &self,
        remote: &str,
        package: &str,
        time: u64,
        recipe_hash: &str,
    ) -> Result<PathBuf> {
        write_package(&self.remote_dir(remote), package, time, recipe_hash).await
    }

    /// Store a binary package in the local cache.
    pub async fn cache_package(
        &self,
        package: &str,
        time: u64,
        recipe_hash: &str,
    ) -> Result<PathBuf> {
        write_package(&self.storage_path(), package, time, recipe_hash).await
    }

    /// Store the exported recipe manifest of `reference` in the local cache
    /// and return its summary hash.
    pub async fn cache_recipe(&self, reference: &str, recipe_content_hash: &str) -> Result<String> {
        let reference: RecipeReference = reference.parse()?;
        let manifest = manifest(1, "conanfile.py", recipe_content_hash);
        let folder = layout::export_dir(&self.storage_path(), &reference);
        fs::create_dir_all(&folder).await?;
        manifest.save(&folder).await?;
        Ok(manifest.summary_hash())
    }

    /// Write a file in the project folder.
    pub async fn write_project_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.project_dir.join(name);
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Run binpm with this environment's home.
    pub fn run_binpm(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = std::process::Command::new(env!("CARGO_BIN_EXE_binpm"))
            .args(args)
            .current_dir(&self.project_dir)
            .env("BINPM_HOME", &self.home)
            .env("NO_COLOR", "1")
            .env_remove("BINPM_REVISIONS_ENABLED")
            .env_remove("RUST_LOG")
            .output()
            .context("Failed to run binpm command")?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }

    /// `assert_cmd` command preconfigured with this environment's home.
    pub fn binpm(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("binpm").unwrap();
        cmd.current_dir(&self.project_dir)
            .env("BINPM_HOME", &self.home)
            .env("NO_COLOR", "1")
            .env_remove("BINPM_REVISIONS_ENABLED")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// Manifest with a single file entry.
pub fn manifest(time: u64, file: &str, hash: &str) -> FileTreeManifest {
    FileTreeManifest::new(time, BTreeMap::from([(file.to_string(), hash.to_string())]))
}

async fn write_package(
    root: &Path,
    package: &str,
    time: u64,
    recipe_hash: &str,
) -> Result<PathBuf> {
    let package: PackageReference = package.parse()?;
    let folder = layout::package_dir(root, &package);
    fs::create_dir_all(&folder).await?;
    PackageInfo::with_recipe_hash(recipe_hash).save(&folder).await?;
    manifest(time, "lib/libz.a", "0af3").save(&folder).await?;
    Ok(folder)
}

/// Convert a path to a file:// URL string, properly handling Windows paths
pub fn path_to_file_url(path: &Path) -> String {
    let path_str = path.display().to_string().replace('\\', "/");
    if path_str.starts_with('/') {
        format!("file://{path_str}")
    } else {
        format!("file:///{path_str}")
    }
}

/// Command output helper
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Assert the command succeeded
    pub fn assert_success(&self) -> &Self {
        assert!(self.success, "Command failed with code {:?}\nStderr: {}", self.code, self.stderr);
        self
    }

    /// Assert the command failed
    pub fn assert_failure(&self) -> &Self {
        assert!(!self.success, "Command unexpectedly succeeded\nStdout: {}", self.stdout);
        self
    }

    /// Assert stdout contains the given text
    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Expected stdout to contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    /// Assert stderr contains the given text
    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Expected stderr to contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
