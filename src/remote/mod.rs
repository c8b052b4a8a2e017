//! Remotes: where prebuilt binaries are looked up.
//!
//! - [`Remote`] - a named server (or `file://` directory) holding packages
//! - [`RemoteError`] - the failure kinds a remote can answer with; the
//!   resolution engine switches on [`RemoteError::is_absent`] to decide
//!   whether to keep probing
//! - [`registry`] - which remote a reference was previously associated with,
//!   plus the ordered list of declared remotes
//! - [`manager`] - fetching package info and manifests from a remote

pub mod manager;
pub mod registry;

pub use manager::{FileRemoteManager, RemoteManager};
pub use registry::{Registry, RemoteRegistry};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A declared remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Remote {
    /// Unique name, e.g. `conan-center`.
    pub name: String,
    /// Base URL of the remote.
    pub url: String,
    /// Whether TLS certificates are verified.
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

const fn default_verify_ssl() -> bool {
    true
}

impl Remote {
    /// Creates a remote that verifies TLS certificates.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            verify_ssl: true,
        }
    }
}

impl fmt::Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Failure answered by a remote for a single request.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The remote is reachable but does not hold the artifact (404)
    #[error("{what} not found in remote '{remote}'")]
    NotFound {
        /// The requested artifact
        what: String,
        /// Remote name
        remote: String,
    },

    /// The remote is unreachable, undeclared or uses an unsupported transport
    #[error("Remote '{remote}' is not available: {reason}")]
    NoRemoteAvailable {
        /// Remote name
        remote: String,
        /// Why it cannot be used
        reason: String,
    },

    /// Authentication required or rejected (401)
    #[error("Authentication failed for remote '{remote}': {message}")]
    Authentication {
        /// Remote name
        remote: String,
        /// Server message
        message: String,
    },

    /// Authenticated but not allowed (403)
    #[error("Permission denied by remote '{remote}': {message}")]
    Forbidden {
        /// Remote name
        remote: String,
        /// Server message
        message: String,
    },

    /// Malformed request (400 and other 4xx)
    #[error("Bad request to remote '{remote}': {message}")]
    BadRequest {
        /// Remote name
        remote: String,
        /// Server message
        message: String,
    },

    /// Server side failure (500 and other 5xx)
    #[error("Internal error in remote '{remote}': {message}")]
    InternalServer {
        /// Remote name
        remote: String,
        /// Server message
        message: String,
    },

    /// Any other transport failure
    #[error("Transport error talking to remote '{remote}'")]
    Transport {
        /// Remote name
        remote: String,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },
}

impl RemoteError {
    /// Maps an HTTP status code answered by `remote` to an error kind.
    ///
    /// Returns `None` for success codes. Codes without a dedicated kind fall
    /// back to their class (`4xx` → [`RemoteError::BadRequest`], `5xx` →
    /// [`RemoteError::InternalServer`]).
    pub fn from_status(status: u16, remote: &str, message: impl Into<String>) -> Option<Self> {
        let remote = remote.to_string();
        let message = message.into();
        let error = match status {
            200..=299 => return None,
            404 => Self::NotFound {
                what: message,
                remote,
            },
            401 => Self::Authentication { remote, message },
            403 => Self::Forbidden { remote, message },
            400..=499 => Self::BadRequest { remote, message },
            500..=599 => Self::InternalServer { remote, message },
            other => Self::Transport {
                remote,
                source: anyhow::anyhow!("unexpected status {other}: {message}"),
            },
        };
        Some(error)
    }

    /// True for the two answers that mean "try elsewhere": the artifact is
    /// absent or the remote cannot be used at all.
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NoRemoteAvailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(RemoteError::from_status(200, "r", "").is_none());
        assert!(matches!(
            RemoteError::from_status(404, "r", "pkg"),
            Some(RemoteError::NotFound { .. })
        ));
        assert!(matches!(
            RemoteError::from_status(401, "r", ""),
            Some(RemoteError::Authentication { .. })
        ));
        assert!(matches!(
            RemoteError::from_status(403, "r", ""),
            Some(RemoteError::Forbidden { .. })
        ));
        assert!(matches!(
            RemoteError::from_status(420, "r", ""),
            Some(RemoteError::BadRequest { .. })
        ));
        assert!(matches!(
            RemoteError::from_status(503, "r", ""),
            Some(RemoteError::InternalServer { .. })
        ));
        assert!(matches!(
            RemoteError::from_status(302, "r", ""),
            Some(RemoteError::Transport { .. })
        ));
    }

    #[test]
    fn test_absent_kinds() {
        let not_found = RemoteError::NotFound {
            what: "x".into(),
            remote: "r".into(),
        };
        let unavailable = RemoteError::NoRemoteAvailable {
            remote: "r".into(),
            reason: "down".into(),
        };
        let forbidden = RemoteError::from_status(403, "r", "no").unwrap();
        assert!(not_found.is_absent());
        assert!(unavailable.is_absent());
        assert!(!forbidden.is_absent());
    }

    #[test]
    fn test_remote_defaults_verify_ssl() {
        let remote: Remote = serde_json::from_str(r#"{"name":"a","url":"file:///tmp"}"#).unwrap();
        assert!(remote.verify_ssl);
        assert_eq!(remote.to_string(), "a");
    }
}
