//! Fetching binary package data from remotes.
//!
//! [`RemoteManager`] is the seam between the resolution engine and whatever
//! transport talks to remotes. The engine only ever asks two questions of a
//! remote: "what recipe was this binary built from" ([`PackageInfo`]) and
//! "what files does this binary contain, and when was it created"
//! ([`FileTreeManifest`]).
//!
//! [`FileRemoteManager`] serves `file://` remotes whose directory uses the
//! same layout as the local package cache. It is what the CLI and the
//! integration tests use; HTTP transports implement the same trait outside
//! this crate.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Remote, RemoteError};
use crate::cache::layout;
use crate::model::{FileTreeManifest, MANIFEST_FILE, PACKAGE_INFO_FILE, PackageInfo};
use crate::reference::PackageReference;
use crate::utils::fs::file_url_to_path;

/// Access to package data held by remotes.
///
/// Both methods must fail with [`RemoteError::NotFound`] when the remote is
/// reachable but lacks the package, and with [`RemoteError::NoRemoteAvailable`]
/// when the remote itself cannot be used. Any other variant is treated as
/// fatal by the resolution engine.
#[async_trait]
pub trait RemoteManager: Send + Sync {
    /// Package info (including the recipe hash) of a binary on `remote`.
    async fn get_package_info(
        &self,
        package: &PackageReference,
        remote: &Remote,
    ) -> Result<PackageInfo, RemoteError>;

    /// File-tree manifest of a binary on `remote`.
    async fn get_package_manifest(
        &self,
        package: &PackageReference,
        remote: &Remote,
    ) -> Result<FileTreeManifest, RemoteError>;
}

/// Remote manager for `file://` remotes.
#[derive(Debug, Clone, Default)]
pub struct FileRemoteManager;

impl FileRemoteManager {
    /// Creates a manager.
    pub const fn new() -> Self {
        Self
    }

    async fn package_file(
        &self,
        package: &PackageReference,
        remote: &Remote,
        file_name: &str,
    ) -> Result<(PathBuf, String), RemoteError> {
        let root = remote_root(remote).await?;
        let path = layout::package_dir(&root, package).join(file_name);
        debug!(remote = %remote.name, path = %path.display(), "Reading remote package file");

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok((path, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RemoteError::NotFound {
                what: format!("Binary package '{package}'"),
                remote: remote.name.clone(),
            }),
            Err(e) => Err(RemoteError::Transport {
                remote: remote.name.clone(),
                source: anyhow::Error::new(e).context(format!("Failed to read {}", path.display())),
            }),
        }
    }
}

async fn remote_root(remote: &Remote) -> Result<PathBuf, RemoteError> {
    let root = file_url_to_path(&remote.url).ok_or_else(|| RemoteError::NoRemoteAvailable {
        remote: remote.name.clone(),
        reason: format!("unsupported remote URL '{}', only file:// remotes are served", remote.url),
    })?;
    if !is_dir(&root).await {
        return Err(RemoteError::NoRemoteAvailable {
            remote: remote.name.clone(),
            reason: format!("directory {} does not exist", root.display()),
        });
    }
    Ok(root)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

fn corrupt(remote: &Remote, path: &Path, reason: impl std::fmt::Display) -> RemoteError {
    RemoteError::Transport {
        remote: remote.name.clone(),
        source: anyhow::anyhow!("Corrupted remote file {}: {reason}", path.display()),
    }
}

#[async_trait]
impl RemoteManager for FileRemoteManager {
    async fn get_package_info(
        &self,
        package: &PackageReference,
        remote: &Remote,
    ) -> Result<PackageInfo, RemoteError> {
        let (path, content) = self.package_file(package, remote, PACKAGE_INFO_FILE).await?;
        PackageInfo::parse(&content).map_err(|e| corrupt(remote, &path, e))
    }

    async fn get_package_manifest(
        &self,
        package: &PackageReference,
        remote: &Remote,
    ) -> Result<FileTreeManifest, RemoteError> {
        let (path, content) = self.package_file(package, remote, MANIFEST_FILE).await?;
        FileTreeManifest::parse(&content).map_err(|e| corrupt(remote, &path, e))
    }
}
