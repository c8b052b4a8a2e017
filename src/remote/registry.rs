//! Remote registry: declared remotes and reference associations.
//!
//! Whenever a recipe or binary is retrieved from a remote, the association is
//! recorded so later resolutions consult the same remote first. The registry
//! is persisted as `registry.json`:
//!
//! ```json
//! {
//!   "remotes": [
//!     { "name": "conan-center", "url": "https://center.example.com", "verify_ssl": true },
//!     { "name": "local", "url": "file:///srv/packages", "verify_ssl": true }
//!   ],
//!   "references": { "zlib/1.2.11@conan/stable": "conan-center" },
//!   "package_references": { "zlib/1.2.11@conan/stable:9e186f6d": "local" }
//! }
//! ```
//!
//! The order of `remotes` is the fallback probing order and is preserved
//! exactly as declared.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::Remote;
use crate::core::BinpmError;
use crate::reference::{PackageReference, RecipeReference};
use crate::utils::fs::atomic_write;

/// Read-only view of remotes used by the resolution engine.
pub trait RemoteRegistry: Send + Sync {
    /// Declared remotes in probing order.
    fn remotes(&self) -> &[Remote];

    /// Looks a remote up by name.
    fn remote(&self, name: &str) -> Option<&Remote> {
        self.remotes().iter().find(|r| r.name == name)
    }

    /// Remote previously associated with a recipe.
    fn remote_for_reference(&self, reference: &RecipeReference) -> Option<&Remote>;

    /// Remote previously associated with a binary package.
    fn remote_for_package(&self, package: &PackageReference) -> Option<&Remote>;
}

/// Registry persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    remotes: Vec<Remote>,
    #[serde(default)]
    references: BTreeMap<RecipeReference, String>,
    #[serde(default)]
    package_references: BTreeMap<PackageReference, String>,
}

fn package_key(package: &PackageReference) -> Result<PackageReference, BinpmError> {
    Ok(PackageReference::new(package.recipe().without_revision(), package.package_id())?)
}

impl Registry {
    /// Creates a registry with the given remotes and no associations.
    pub fn with_remotes(remotes: Vec<Remote>) -> Self {
        Self {
            remotes,
            ..Self::default()
        }
    }

    /// Loads the registry; a missing file yields an empty registry.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("No registry at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read registry {}", path.display()))?;
        let registry = serde_json::from_str(&content).map_err(|e| BinpmError::ParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(registry)
    }

    /// Saves the registry atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize registry")?;
        atomic_write(path, content.as_bytes())
            .with_context(|| format!("Failed to save registry {}", path.display()))
    }

    /// Declares a new remote at the end of the probing order.
    pub fn add_remote(&mut self, remote: Remote) -> Result<(), BinpmError> {
        if self.remote(&remote.name).is_some() {
            return Err(BinpmError::DuplicateRemote { name: remote.name });
        }
        self.remotes.push(remote);
        Ok(())
    }

    /// Removes a remote and every association pointing at it.
    pub fn remove_remote(&mut self, name: &str) -> Result<Remote, BinpmError> {
        let position = self
            .remotes
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| self.unknown(name))?;
        self.references.retain(|_, remote| remote != name);
        self.package_references.retain(|_, remote| remote != name);
        Ok(self.remotes.remove(position))
    }

    /// Associates a recipe with a declared remote.
    pub fn set_reference_remote(
        &mut self,
        reference: &RecipeReference,
        remote: &str,
    ) -> Result<(), BinpmError> {
        if self.remote(remote).is_none() {
            return Err(self.unknown(remote));
        }
        self.references.insert(reference.without_revision(), remote.to_string());
        Ok(())
    }

    /// Associates a binary package with a declared remote.
    pub fn set_package_remote(
        &mut self,
        package: &PackageReference,
        remote: &str,
    ) -> Result<(), BinpmError> {
        if self.remote(remote).is_none() {
            return Err(self.unknown(remote));
        }
        self.package_references.insert(package_key(package)?, remote.to_string());
        Ok(())
    }

    /// Error for an undeclared remote name, with a did-you-mean suggestion.
    pub fn unknown(&self, name: &str) -> BinpmError {
        BinpmError::unknown_remote(name, self.remotes.iter().map(|r| r.name.as_str()))
    }
}

impl RemoteRegistry for Registry {
    fn remotes(&self) -> &[Remote] {
        &self.remotes
    }

    fn remote_for_reference(&self, reference: &RecipeReference) -> Option<&Remote> {
        let name = self.references.get(&reference.without_revision())?;
        self.remote(name)
    }

    fn remote_for_package(&self, package: &PackageReference) -> Option<&Remote> {
        let key = package_key(package).ok()?;
        let name = self.package_references.get(&key)?;
        self.remote(name)
    }
}
