//! Persisted package models read by the resolution engine.
//!
//! - [`FileTreeManifest`] - timestamped content hashes of a recipe or package
//! - [`PackageInfo`] - the configuration record of a built package, most
//!   importantly the hash of the recipe it was built from
//! - [`PackageMetadata`] - recipe and package revisions kept in the cache

pub mod info;
pub mod manifest;
pub mod metadata;

pub use info::{PACKAGE_INFO_FILE, PackageInfo};
pub use manifest::{FileTreeManifest, MANIFEST_FILE};
pub use metadata::{BinaryMetadata, METADATA_FILE, PackageMetadata, RecipeMetadata};
