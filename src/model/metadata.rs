//! Revision metadata stored next to each recipe in the cache (`metadata.json`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::BinpmError;

/// Name of the metadata file inside a recipe folder.
pub const METADATA_FILE: &str = "metadata.json";

/// Revisions and origin remotes of a recipe and its binaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Recipe revision and the remote it came from.
    #[serde(default)]
    pub recipe: RecipeMetadata,
    /// Per package id metadata.
    #[serde(default)]
    pub packages: BTreeMap<String, BinaryMetadata>,
}

/// Metadata of the exported recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeMetadata {
    /// Recipe revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Remote the recipe was retrieved from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

/// Metadata of one binary package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryMetadata {
    /// Package revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Revision of the recipe the binary was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_revision: Option<String>,
    /// Remote the binary was retrieved from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

impl PackageMetadata {
    /// Recipe revision a cached binary was built from, if recorded.
    pub fn recipe_revision_of(&self, package_id: &str) -> Option<&str> {
        self.packages.get(package_id)?.recipe_revision.as_deref()
    }

    /// Loads `metadata.json` from a recipe folder; a missing file yields
    /// empty metadata.
    pub async fn load(folder: &Path) -> Result<Self> {
        let path = folder.join(METADATA_FILE);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read metadata {}", path.display()))?;
        let metadata = serde_json::from_str(&content).map_err(|e| BinpmError::ParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(metadata)
    }

    /// Writes `metadata.json` into a recipe folder.
    pub async fn save(&self, folder: &Path) -> Result<()> {
        let path = folder.join(METADATA_FILE);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize metadata")?;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write metadata {}", path.display()))
    }
}
