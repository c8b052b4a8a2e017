//! Local package cache.
//!
//! The resolution engine talks to the cache through the [`CacheStore`]
//! trait, which exposes exactly what a binary decision needs:
//!
//! - where a package folder lives and whether it exists
//! - a scoped exclusive lock per package reference ([`PackageLock`])
//! - the dirty flag left behind by an interrupted write, and purging it
//! - the persisted recipe manifest, package manifest, package info and
//!   revision metadata
//!
//! [`PackageCache`] is the file system implementation, rooted at the
//! configured storage path and laid out as described in [`layout`].

pub mod layout;
pub mod lock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::model::{FileTreeManifest, PackageInfo, PackageMetadata};
use crate::reference::{PackageReference, RecipeReference};
use lock::CacheLock;

/// Scoped exclusive access to one package folder.
///
/// Whatever guard the store hands out is released when this value is
/// dropped, including on early return through `?`.
pub struct PackageLock {
    _guard: Box<dyn Send + Sync>,
}

impl PackageLock {
    /// Wraps a store specific guard.
    pub fn new(guard: impl Send + Sync + 'static) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for PackageLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageLock").finish_non_exhaustive()
    }
}

/// Operations the resolution engine performs on the local cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Folder where the binary of `package` is (or would be) stored.
    async fn package_folder(&self, package: &PackageReference, short_paths: bool)
    -> Result<PathBuf>;

    /// Whether the package folder exists.
    async fn package_exists(&self, folder: &Path) -> Result<bool>;

    /// Acquires the exclusive lock for `package`.
    async fn package_lock(&self, package: &PackageReference) -> Result<PackageLock>;

    /// Whether `folder` was left half written by an interrupted operation.
    async fn is_dirty(&self, folder: &Path) -> Result<bool>;

    /// Deletes `folder` and clears its dirty flag.
    async fn purge(&self, folder: &Path) -> Result<()>;

    /// Manifest of the exported recipe.
    async fn load_recipe_manifest(&self, reference: &RecipeReference) -> Result<FileTreeManifest>;

    /// Manifest stored in a package folder.
    async fn load_package_manifest(&self, folder: &Path) -> Result<FileTreeManifest>;

    /// Package info stored in a package folder.
    async fn load_package_info(&self, folder: &Path) -> Result<PackageInfo>;

    /// Revision metadata of a recipe and its binaries.
    async fn load_metadata(&self, reference: &RecipeReference) -> Result<PackageMetadata>;
}

/// File system package cache.
#[derive(Debug, Clone)]
pub struct PackageCache {
    storage: PathBuf,
}

impl PackageCache {
    /// Creates a cache rooted at `storage`. Nothing is created on disk until
    /// a lock is taken or a package is written.
    pub fn new(storage: impl Into<PathBuf>) -> Self {
        Self {
            storage: storage.into(),
        }
    }

    /// Root of the cache.
    pub fn storage(&self) -> &Path {
        &self.storage
    }

    /// Marks `folder` as being written. Writers call this before touching a
    /// package folder and [`PackageCache::clean_dirty`] once done.
    pub async fn set_dirty(&self, folder: &Path) -> Result<()> {
        let flag = layout::dirty_flag(folder);
        if let Some(parent) = flag.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&flag, b"")
            .await
            .with_context(|| format!("Failed to write dirty flag {}", flag.display()))
    }

    /// Clears the dirty flag of `folder`, if any.
    pub async fn clean_dirty(&self, folder: &Path) -> Result<()> {
        let flag = layout::dirty_flag(folder);
        match tokio::fs::remove_file(&flag).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove dirty flag {}", flag.display()))
            }
        }
    }
}

#[async_trait]
impl CacheStore for PackageCache {
    async fn package_folder(
        &self,
        package: &PackageReference,
        short_paths: bool,
    ) -> Result<PathBuf> {
        let folder = layout::package_dir(&self.storage, package);
        if short_paths {
            let link = folder.join(layout::SHORT_PATH_LINK);
            if let Ok(target) = tokio::fs::read_to_string(&link).await {
                let target = PathBuf::from(target.trim());
                debug!("Package {} redirected to short path {}", package, target.display());
                return Ok(target);
            }
        }
        Ok(folder)
    }

    async fn package_exists(&self, folder: &Path) -> Result<bool> {
        match tokio::fs::metadata(folder).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to inspect {}", folder.display())),
        }
    }

    async fn package_lock(&self, package: &PackageReference) -> Result<PackageLock> {
        let lock = CacheLock::acquire(&self.storage, &layout::lock_name(package)).await?;
        Ok(PackageLock::new(lock))
    }

    async fn is_dirty(&self, folder: &Path) -> Result<bool> {
        let flag = layout::dirty_flag(folder);
        tokio::fs::try_exists(&flag)
            .await
            .with_context(|| format!("Failed to check dirty flag {}", flag.display()))
    }

    async fn purge(&self, folder: &Path) -> Result<()> {
        match tokio::fs::remove_dir_all(folder).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove {}", folder.display()));
            }
        }
        self.clean_dirty(folder).await
    }

    async fn load_recipe_manifest(&self, reference: &RecipeReference) -> Result<FileTreeManifest> {
        FileTreeManifest::load(&layout::export_dir(&self.storage, reference))
            .await
            .with_context(|| format!("Failed to load recipe manifest of {reference}"))
    }

    async fn load_package_manifest(&self, folder: &Path) -> Result<FileTreeManifest> {
        FileTreeManifest::load(folder).await
    }

    async fn load_package_info(&self, folder: &Path) -> Result<PackageInfo> {
        PackageInfo::load(folder).await
    }

    async fn load_metadata(&self, reference: &RecipeReference) -> Result<PackageMetadata> {
        PackageMetadata::load(&layout::recipe_dir(&self.storage, reference)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package() -> PackageReference {
        "zlib/1.2.11@user/stable:abc".parse().unwrap()
    }

    #[tokio::test]
    async fn test_dirty_folder_purge() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let folder = cache.package_folder(&package(), false).await.unwrap();
        assert!(!cache.package_exists(&folder).await.unwrap());

        std::fs::create_dir_all(folder.join("lib")).unwrap();
        std::fs::write(folder.join("lib/libz.a"), "partial").unwrap();
        cache.set_dirty(&folder).await.unwrap();
        assert!(cache.is_dirty(&folder).await.unwrap());
        assert!(cache.package_exists(&folder).await.unwrap());

        cache.purge(&folder).await.unwrap();
        assert!(!cache.package_exists(&folder).await.unwrap());
        assert!(!cache.is_dirty(&folder).await.unwrap());

        // Purging twice is harmless
        cache.purge(&folder).await.unwrap();
    }

    #[tokio::test]
    async fn test_short_paths_redirect() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path().join("data"));
        let short = temp.path().join("s").join("1");
        let folder = cache.package_folder(&package(), true).await.unwrap();
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join(layout::SHORT_PATH_LINK), short.display().to_string()).unwrap();

        assert_eq!(cache.package_folder(&package(), true).await.unwrap(), short);
        assert_eq!(cache.package_folder(&package(), false).await.unwrap(), folder);
    }

    #[tokio::test]
    async fn test_lock_is_released_on_drop() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let lock = cache.package_lock(&package()).await.unwrap();
        drop(lock);
        let _relock = cache.package_lock(&package()).await.unwrap();
        assert!(temp.path().join(".locks/zlib-1.2.11-user-stable-abc.lock").exists());
    }

    #[tokio::test]
    async fn test_loads_persisted_files() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let reference = package().recipe().clone();

        let export = layout::export_dir(temp.path(), &reference);
        std::fs::create_dir_all(&export).unwrap();
        let recipe_manifest =
            FileTreeManifest::new(1, [("conanfile.py".to_string(), "h".to_string())].into());
        recipe_manifest.save(&export).await.unwrap();

        let folder = cache.package_folder(&package(), false).await.unwrap();
        std::fs::create_dir_all(&folder).unwrap();
        PackageInfo::with_recipe_hash(recipe_manifest.summary_hash()).save(&folder).await.unwrap();

        let loaded = cache.load_recipe_manifest(&reference).await.unwrap();
        let info = cache.load_package_info(&folder).await.unwrap();
        assert_eq!(info.recipe_hash(), Some(loaded.summary_hash().as_str()));
        assert!(cache.load_package_manifest(&folder).await.is_err());
        assert_eq!(cache.load_metadata(&reference).await.unwrap(), PackageMetadata::default());
    }
}
