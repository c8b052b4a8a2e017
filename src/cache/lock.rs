//! File locking for package folders.
//!
//! Each package folder is guarded by an OS-level exclusive lock on a file in
//! `{storage}/.locks/`, so concurrent resolutions (in this or another
//! process) never inspect and purge the same half-written folder at the same
//! time. The lock is released when the [`CacheLock`] is dropped.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;

/// An exclusive file lock held until drop.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Acquires the exclusive lock `{storage}/.locks/{lock_name}.lock`.
    ///
    /// The blocking OS call runs on tokio's blocking pool. If another holder
    /// exists the returned future waits for it indefinitely; there is no
    /// timeout.
    ///
    /// # Errors
    ///
    /// Fails when the locks directory or the lock file cannot be created, or
    /// when the file system does not support locking.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use binpm::cache::lock::CacheLock;
    /// use std::path::PathBuf;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let storage = PathBuf::from("/home/user/.binpm/data");
    /// let lock = CacheLock::acquire(&storage, "zlib-1.2.11-conan-stable-9e186f6d").await?;
    /// // inspect or purge the package folder...
    /// drop(lock);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn acquire(storage: &Path, lock_name: &str) -> Result<Self> {
        let locks_dir = storage.join(".locks");
        tokio::fs::create_dir_all(&locks_dir)
            .await
            .with_context(|| format!("Failed to create locks directory {}", locks_dir.display()))?;

        let path = locks_dir.join(format!("{lock_name}.lock"));
        let target = path.clone();
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&target)
                .with_context(|| format!("Failed to open lock file {}", target.display()))?;
            file.lock_exclusive()
                .with_context(|| format!("Failed to lock {}", target.display()))?;
            Ok(file)
        })
        .await
        .context("Lock acquisition task panicked")??;

        Ok(Self {
            file,
            path,
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = self.file.unlock() {
            warn!(path = %self.path.display(), "Failed to release package lock: {e}");
        }
    }
}
