//! Configuration management for binpm
//!
//! binpm has a single user-level configuration file, see [`global`]. It
//! decides where the package cache and the remote registry live and whether
//! recipe revisions are tracked. Nothing in it is project specific: the
//! dependency graph and the workspace are given per invocation.

pub mod global;

pub use global::GlobalConfig;
