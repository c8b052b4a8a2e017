//! Error handling for binpm
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling in code ([`BinpmError`])
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!    ([`ErrorContext`])
//!
//! Library code returns [`anyhow::Result`] and attaches context with
//! `.with_context(...)`; the typed variants below travel inside the
//! [`anyhow::Error`] and are recovered by [`user_friendly_error`] when the CLI
//! renders a failure.
//!
//! # Error Categories
//!
//! - **Identifiers**: [`BinpmError::InvalidReference`] (fatal, never retried)
//! - **Remotes**: [`BinpmError::Remote`], [`BinpmError::UnknownRemote`],
//!   [`BinpmError::DuplicateRemote`]
//! - **Policy**: [`BinpmError::BuildModeConflict`], [`BinpmError::InvalidBuildPattern`]
//! - **Inputs**: [`BinpmError::GraphError`], [`BinpmError::ParseError`]
//! - **File system**: [`BinpmError::IoError`]
//!
//! Absent artifacts and unreachable remotes met while probing for a binary
//! are *not* errors at this level: the resolution engine consumes them and
//! falls through to the next remote or to a build decision.
//!
//! # Examples
//!
//! ```rust,no_run
//! use binpm::core::{BinpmError, ErrorContext, user_friendly_error};
//!
//! let error = BinpmError::UnknownRemote {
//!     name: "conan-centre".to_string(),
//!     suggestion: Some("conan-center".to_string()),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // colored error, details and suggestion on stderr
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::reference::ReferenceError;
use crate::remote::RemoteError;

/// The main error type for binpm operations
#[derive(Error, Debug)]
pub enum BinpmError {
    /// A reference, version, revision or package id failed validation
    #[error(transparent)]
    InvalidReference(#[from] ReferenceError),

    /// A remote answered with an error that is not a plain "not found"
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A remote name that the registry does not declare
    #[error("No remote '{name}' defined in remotes")]
    UnknownRemote {
        /// The requested remote name
        name: String,
        /// Closest declared remote name, if any is similar
        suggestion: Option<String>,
    },

    /// Adding a remote whose name is already declared
    #[error("Remote '{name}' already exists in remotes")]
    DuplicateRemote {
        /// The duplicated remote name
        name: String,
    },

    /// Incompatible `--build` arguments
    #[error("Invalid build mode: {message}")]
    BuildModeConflict {
        /// What was combined incorrectly
        message: String,
    },

    /// A `--build` pattern that is not a valid glob
    #[error("Invalid build pattern '{pattern}': {reason}")]
    InvalidBuildPattern {
        /// The pattern as given
        pattern: String,
        /// Why the glob failed to compile
        reason: String,
    },

    /// The dependency graph description is inconsistent
    #[error("Invalid dependency graph: {message}")]
    GraphError {
        /// Description of the inconsistency
        message: String,
    },

    /// A persisted file could not be parsed
    #[error("Failed to parse {file}: {reason}")]
    ParseError {
        /// The file that failed to parse
        file: String,
        /// Parser message
        reason: String,
    },

    /// Standard I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Anything else worth reporting with a message
    #[error("{message}")]
    Other {
        /// The message
        message: String,
    },
}

impl BinpmError {
    /// Builds an [`BinpmError::UnknownRemote`] with a did-you-mean suggestion
    /// picked from `known` by edit distance.
    pub fn unknown_remote<'a>(name: &str, known: impl IntoIterator<Item = &'a str>) -> Self {
        let suggestion = known
            .into_iter()
            .map(|candidate| (strsim::levenshtein(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= 3)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate.to_string());
        Self::UnknownRemote {
            name: name.to_string(),
            suggestion,
        }
    }
}

/// Error wrapper carrying a user-facing suggestion and details
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: BinpmError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: BinpmError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error, shown in green.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error, shown in yellow.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for CLI display.
///
/// Typed [`BinpmError`]s found anywhere in the chain get tailored
/// suggestions; everything else is reported with its full context chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let chain = error.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>();
    let outer = error.to_string();

    match error.downcast::<BinpmError>() {
        Ok(typed) => create_error_context(typed),
        Err(error) => {
            if let Some(reference_error) = error.downcast_ref::<ReferenceError>() {
                return create_error_context(BinpmError::InvalidReference(reference_error.clone()));
            }
            let ctx = ErrorContext::new(BinpmError::Other { message: outer });
            if chain.is_empty() {
                ctx
            } else {
                ctx.with_details(chain.join(": "))
            }
        }
    }
}

fn create_error_context(error: BinpmError) -> ErrorContext {
    match &error {
        BinpmError::InvalidReference(_) => ErrorContext::new(error)
            .with_suggestion("Write references as 'name/version@user/channel', optionally followed by '#revision'")
            .with_details("Names must be 2 to 51 characters long, start with a letter, digit or '_', and use only letters, digits and '_', '+', '.', '-'"),
        BinpmError::UnknownRemote { suggestion, .. } => {
            let hint = match suggestion {
                Some(name) => format!("Did you mean '{name}'? Run 'binpm remote list' to see declared remotes"),
                None => "Run 'binpm remote list' to see declared remotes, or add one with 'binpm remote add'".to_string(),
            };
            ErrorContext::new(error).with_suggestion(hint)
        }
        BinpmError::DuplicateRemote { .. } => ErrorContext::new(error)
            .with_suggestion("Remove the existing remote first with 'binpm remote remove'"),
        BinpmError::Remote(_) => ErrorContext::new(error)
            .with_suggestion("Check the remote URL and your credentials")
            .with_details("Only missing packages and unreachable remotes are skipped during resolution; other remote failures abort it"),
        BinpmError::BuildModeConflict { .. } | BinpmError::InvalidBuildPattern { .. } => {
            ErrorContext::new(error).with_suggestion(
                "Use '--build' alone, '--build=missing', '--build=outdated', '--build=never' or package name patterns such as '--build=zlib*'",
            )
        }
        BinpmError::GraphError { .. } => ErrorContext::new(error)
            .with_suggestion("Check that every edge refers to a declared node id and that the graph has no cycles"),
        BinpmError::ParseError { file, .. } => {
            let suggestion = format!("Check the syntax of {file}");
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        _ => ErrorContext::new(error),
    }
}
