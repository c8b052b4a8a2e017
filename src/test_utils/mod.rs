//! Test utilities for binpm
//!
//! In-memory implementations of the cache and remote seams that record every
//! call, so tests can assert not only what the resolution engine decided but
//! also how much I/O it performed to get there.
//!
//! # Example
//!
//! ```rust,ignore
//! use binpm::test_utils::{MockCache, MockRemoteManager};
//!
//! let cache = MockCache::new();
//! let remotes = MockRemoteManager::new();
//! // ...run an analysis...
//! assert_eq!(remotes.call_count(), 1);
//! assert!(cache.calls().iter().all(|call| call != "purge"));
//! ```

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::cache::{CacheStore, PackageLock, layout};
use crate::model::{FileTreeManifest, PackageInfo, PackageMetadata};
use crate::reference::{PackageReference, RecipeReference};
use crate::remote::{Remote, RemoteError, RemoteManager};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Respects `RUST_LOG` when set, otherwise uses `level`; with neither, tests
/// run without a subscriber.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Manifest with a single file, handy for building fixtures.
pub fn manifest(time: u64, file: &str, hash: &str) -> FileTreeManifest {
    FileTreeManifest::new(time, [(file.to_string(), hash.to_string())].into())
}

#[derive(Default)]
struct MockFolder {
    manifest: Option<FileTreeManifest>,
    info: Option<PackageInfo>,
}

#[derive(Default)]
struct MockCacheState {
    folders: HashMap<PathBuf, MockFolder>,
    dirty: HashSet<PathBuf>,
    recipe_manifests: HashMap<RecipeReference, FileTreeManifest>,
    metadata: HashMap<RecipeReference, PackageMetadata>,
    fail_dirty_checks: bool,
}

/// In-memory [`CacheStore`].
pub struct MockCache {
    root: PathBuf,
    state: Mutex<MockCacheState>,
    calls: Mutex<Vec<String>>,
    locks_held: Arc<AtomicUsize>,
}

struct MockLockGuard {
    held: Arc<AtomicUsize>,
}

impl Drop for MockLockGuard {
    fn drop(&mut self) {
        self.held.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MockCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/mock-cache"),
            state: Mutex::new(MockCacheState::default()),
            calls: Mutex::new(Vec::new()),
            locks_held: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Folder a package is stored in.
    pub fn folder(&self, package: &PackageReference) -> PathBuf {
        layout::package_dir(&self.root, package)
    }

    /// Stores a binary package.
    pub fn add_package(
        &self,
        package: &PackageReference,
        manifest: FileTreeManifest,
        info: PackageInfo,
    ) -> PathBuf {
        let folder = self.folder(package);
        self.state.lock().unwrap().folders.insert(
            folder.clone(),
            MockFolder {
                manifest: Some(manifest),
                info: Some(info),
            },
        );
        folder
    }

    /// Flags a package folder as half written.
    pub fn mark_dirty(&self, package: &PackageReference) {
        let folder = self.folder(package);
        self.state.lock().unwrap().dirty.insert(folder);
    }

    /// Stores the manifest of an exported recipe.
    pub fn set_recipe_manifest(&self, reference: &RecipeReference, manifest: FileTreeManifest) {
        self.state
            .lock()
            .unwrap()
            .recipe_manifests
            .insert(reference.without_revision(), manifest);
    }

    /// Stores the revision metadata of a recipe.
    pub fn set_metadata(&self, reference: &RecipeReference, metadata: PackageMetadata) {
        self.state.lock().unwrap().metadata.insert(reference.without_revision(), metadata);
    }

    /// Makes every dirty check fail with an I/O error.
    pub fn fail_dirty_checks(&self) {
        self.state.lock().unwrap().fail_dirty_checks = true;
    }

    /// Whether a package folder exists.
    pub fn contains(&self, package: &PackageReference) -> bool {
        self.state.lock().unwrap().folders.contains_key(&self.folder(package))
    }

    /// Names of the operations called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of operations called so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of package locks currently held.
    pub fn locks_held(&self) -> usize {
        self.locks_held.load(Ordering::SeqCst)
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl CacheStore for MockCache {
    async fn package_folder(
        &self,
        package: &PackageReference,
        _short_paths: bool,
    ) -> Result<PathBuf> {
        self.record("package_folder");
        Ok(self.folder(package))
    }

    async fn package_exists(&self, folder: &Path) -> Result<bool> {
        self.record("package_exists");
        Ok(self.state.lock().unwrap().folders.contains_key(folder))
    }

    async fn package_lock(&self, _package: &PackageReference) -> Result<PackageLock> {
        self.record("package_lock");
        self.locks_held.fetch_add(1, Ordering::SeqCst);
        Ok(PackageLock::new(MockLockGuard {
            held: self.locks_held.clone(),
        }))
    }

    async fn is_dirty(&self, folder: &Path) -> Result<bool> {
        self.record("is_dirty");
        let state = self.state.lock().unwrap();
        if state.fail_dirty_checks {
            return Err(anyhow!("Failed to check dirty flag of {}", folder.display()));
        }
        Ok(state.dirty.contains(folder))
    }

    async fn purge(&self, folder: &Path) -> Result<()> {
        self.record("purge");
        let mut state = self.state.lock().unwrap();
        state.folders.remove(folder);
        state.dirty.remove(folder);
        Ok(())
    }

    async fn load_recipe_manifest(&self, reference: &RecipeReference) -> Result<FileTreeManifest> {
        self.record("load_recipe_manifest");
        self.state
            .lock()
            .unwrap()
            .recipe_manifests
            .get(&reference.without_revision())
            .cloned()
            .ok_or_else(|| anyhow!("No recipe manifest for {reference}"))
    }

    async fn load_package_manifest(&self, folder: &Path) -> Result<FileTreeManifest> {
        self.record("load_package_manifest");
        self.state
            .lock()
            .unwrap()
            .folders
            .get(folder)
            .and_then(|f| f.manifest.clone())
            .ok_or_else(|| anyhow!("No manifest in {}", folder.display()))
    }

    async fn load_package_info(&self, folder: &Path) -> Result<PackageInfo> {
        self.record("load_package_info");
        self.state
            .lock()
            .unwrap()
            .folders
            .get(folder)
            .and_then(|f| f.info.clone())
            .ok_or_else(|| anyhow!("No package info in {}", folder.display()))
    }

    async fn load_metadata(&self, reference: &RecipeReference) -> Result<PackageMetadata> {
        self.record("load_metadata");
        Ok(self
            .state
            .lock()
            .unwrap()
            .metadata
            .get(&reference.without_revision())
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Clone)]
struct MockRemotePackage {
    info: PackageInfo,
    manifest: FileTreeManifest,
}

/// In-memory [`RemoteManager`].
#[derive(Default)]
pub struct MockRemoteManager {
    packages: Mutex<HashMap<(String, PackageReference), MockRemotePackage>>,
    unavailable: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<String, u16>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockRemoteManager {
    /// Creates a manager whose remotes are reachable and empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a binary on `remote`.
    pub fn add_package(
        &self,
        remote: &str,
        package: &PackageReference,
        info: PackageInfo,
        manifest: FileTreeManifest,
    ) {
        self.packages.lock().unwrap().insert(
            (remote.to_string(), package.clone()),
            MockRemotePackage { info, manifest },
        );
    }

    /// Makes `remote` answer every request with `NoRemoteAvailable`.
    pub fn set_unavailable(&self, remote: &str) {
        self.unavailable.lock().unwrap().insert(remote.to_string());
    }

    /// Makes `remote` answer every request with the error for an HTTP status.
    pub fn fail_with(&self, remote: &str, status: u16) {
        self.failures.lock().unwrap().insert(remote.to_string(), status);
    }

    /// `(operation, remote)` pairs called so far, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn lookup(
        &self,
        operation: &str,
        package: &PackageReference,
        remote: &Remote,
    ) -> Result<MockRemotePackage, RemoteError> {
        self.calls.lock().unwrap().push((operation.to_string(), remote.name.clone()));

        if let Some(status) = self.failures.lock().unwrap().get(&remote.name) {
            return Err(RemoteError::from_status(*status, &remote.name, "mock failure")
                .unwrap_or_else(|| RemoteError::InternalServer {
                    remote: remote.name.clone(),
                    message: "mock failure".to_string(),
                }));
        }
        if self.unavailable.lock().unwrap().contains(&remote.name) {
            return Err(RemoteError::NoRemoteAvailable {
                remote: remote.name.clone(),
                reason: "unreachable".to_string(),
            });
        }
        self.packages
            .lock()
            .unwrap()
            .get(&(remote.name.clone(), package.clone()))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                what: format!("Binary package '{package}'"),
                remote: remote.name.clone(),
            })
    }
}

#[async_trait]
impl RemoteManager for MockRemoteManager {
    async fn get_package_info(
        &self,
        package: &PackageReference,
        remote: &Remote,
    ) -> Result<PackageInfo, RemoteError> {
        self.lookup("get_package_info", package, remote).map(|p| p.info)
    }

    async fn get_package_manifest(
        &self,
        package: &PackageReference,
        remote: &Remote,
    ) -> Result<FileTreeManifest, RemoteError> {
        self.lookup("get_package_manifest", package, remote).map(|p| p.manifest)
    }
}
