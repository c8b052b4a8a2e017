//! Core types for binpm
//!
//! This module holds the crate-wide error type and the user-facing error
//! rendering used by the CLI. Domain types live in their own modules
//! ([`crate::reference`], [`crate::graph`], [`crate::binaries`]).

pub mod error;

pub use error::{BinpmError, ErrorContext, user_friendly_error};
