//! binpm - binary resolution for compiled-library packages
//!
//! Given a dependency graph whose nodes already carry a recipe reference and
//! a package id (the hash of the build settings), binpm decides for every
//! node where its binary comes from:
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `BUILD` | Build from source |
//! | `CACHE` | Reuse the binary in the local package cache |
//! | `DOWNLOAD` | Fetch the binary from a remote |
//! | `UPDATE` | A newer binary exists in a remote, fetch it |
//! | `MISSING` | No binary anywhere and building was not requested |
//! | `SKIP` | Private dependency of a reused binary, not needed |
//! | `WORKSPACE` | Provided by an editable package of the workspace |
//!
//! # Modules
//!
//! ## Engine
//! - [`binaries`] - The resolution engine and its report
//! - [`build_mode`] - `--build` policies and patterns
//! - [`graph`] - Dependency graph, nodes and edges
//!
//! ## Data
//! - [`reference`] - Recipe and package references
//! - [`model`] - Manifests, package info and cache metadata
//! - [`workspace`] - Editable local packages
//!
//! ## Storage and remotes
//! - [`cache`] - Local package cache: layout, locks, dirty flags
//! - [`remote`] - Remotes, the remote registry and the `file://` manager
//!
//! ## Supporting
//! - [`cli`] - Command-line interface
//! - [`config`] - Global configuration (`~/.binpm/config.toml`)
//! - [`core`] - Error types and user-facing error rendering
//! - [`utils`] - File helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use binpm::binaries::{BinaryAnalyzer, BinaryReport};
//! use binpm::build_mode::BuildMode;
//! use binpm::cache::PackageCache;
//! use binpm::graph::DepsGraph;
//! use binpm::remote::{FileRemoteManager, Registry};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut graph = DepsGraph::load(Path::new("graph.json")).await?;
//! let registry = Registry::load(Path::new("registry.json")).await?;
//! let cache = PackageCache::new("/var/cache/binpm");
//! let remotes = FileRemoteManager::new();
//!
//! let build_mode = BuildMode::new(Some(&["missing".to_string()]))?;
//! BinaryAnalyzer::new(&cache, &remotes, &registry)
//!     .evaluate_graph(&mut graph, &build_mode, false, None)
//!     .await?;
//! print!("{}", BinaryReport::from_graph(&graph));
//! # Ok(())
//! # }
//! ```

// Engine
pub mod binaries;
pub mod build_mode;
pub mod graph;

// Data
pub mod model;
pub mod reference;
pub mod workspace;

// Storage and remotes
pub mod cache;
pub mod remote;

// Supporting modules
pub mod cli;
pub mod config;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
