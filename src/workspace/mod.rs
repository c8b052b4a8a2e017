//! Workspaces: packages edited in local folders instead of the cache.
//!
//! A workspace file lists editable packages and where their sources live:
//!
//! ```yaml
//! editables:
//!   hello/0.1@user/testing:
//!     path: hello
//!   chat/0.1@user/testing:
//!     path: /work/chat
//! root: chat/0.1@user/testing
//! ```
//!
//! Relative paths are resolved against the directory holding the file. Any
//! node whose reference is listed resolves to `WORKSPACE` and is never looked
//! up in the cache or on remotes.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::BinpmError;
use crate::reference::RecipeReference;

/// An editable package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPackage {
    /// Folder holding the package sources.
    pub path: PathBuf,
}

/// Set of editable packages.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    packages: BTreeMap<RecipeReference, LocalPackage>,
    root: Option<RecipeReference>,
}

#[derive(Deserialize)]
struct WorkspaceFile {
    #[serde(default)]
    editables: BTreeMap<String, EditableEntry>,
    root: Option<String>,
}

#[derive(Deserialize)]
struct EditableEntry {
    path: PathBuf,
}

impl Workspace {
    /// Creates an empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an editable package.
    pub fn insert(&mut self, reference: &RecipeReference, package: LocalPackage) {
        self.packages.insert(reference.without_revision(), package);
    }

    /// Parses workspace YAML, resolving relative paths against `base_dir`.
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, BinpmError> {
        let file: WorkspaceFile = serde_yaml::from_str(content).map_err(|e| {
            BinpmError::ParseError {
                file: "workspace".to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut workspace = Self::new();
        for (reference, entry) in file.editables {
            let reference: RecipeReference = reference.parse()?;
            let path = if entry.path.is_absolute() {
                entry.path
            } else {
                base_dir.join(entry.path)
            };
            workspace.insert(&reference, LocalPackage { path });
        }
        workspace.root = file.root.map(|root| root.parse()).transpose()?;
        Ok(workspace)
    }

    /// Loads a workspace file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read workspace {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Workspace::parse(&content, base_dir).map_err(|e| match e {
            BinpmError::ParseError { reason, .. } => BinpmError::ParseError {
                file: path.display().to_string(),
                reason,
            }
            .into(),
            other => anyhow::Error::from(other)
                .context(format!("Invalid workspace {}", path.display())),
        })
    }

    /// The editable package for `reference`, ignoring revisions.
    pub fn lookup(&self, reference: &RecipeReference) -> Option<&LocalPackage> {
        self.packages.get(&reference.without_revision())
    }

    /// Reference of the workspace root package, if declared.
    pub fn root(&self) -> Option<&RecipeReference> {
        self.root.as_ref()
    }

    /// Number of editable packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the workspace has no editable packages.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
