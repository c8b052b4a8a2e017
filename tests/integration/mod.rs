//! Integration test suite for binpm
//!
//! End-to-end tests over a real package cache on disk, `file://` remotes and
//! the `binpm` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **analyze**: `binpm analyze` output, exit codes and error rendering
//! - **remote**: `binpm remote` registry management
//! - **resolution**: the resolution engine over the filesystem cache and
//!   `file://` remotes, without the CLI

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod analyze;
mod remote;
mod resolution;
