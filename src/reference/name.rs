//! Identifier grammar shared by every reference component.
//!
//! Names, users and channels are short identifiers built from
//! `[A-Za-z0-9_.+-]` that must start with an alphanumeric character or an
//! underscore. Versions follow the same grammar but may also be a bracketed
//! range expression, which is kept as an opaque string. The literal `*` is
//! accepted everywhere as a wildcard.

use regex::Regex;
use std::sync::LazyLock;

use super::ReferenceError;

/// Minimum length of a name, version, user or channel.
pub const MIN_CHARS: usize = 2;

/// Maximum length of a name, version, user or channel (and of a revision).
pub const MAX_CHARS: usize = 51;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^[a-zA-Z0-9_][a-zA-Z0-9_+.-]{{{},{}}}$", MIN_CHARS - 1, MAX_CHARS - 1))
        .expect("static name pattern is valid")
});

static REVISION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^[a-zA-Z0-9]{{1,{MAX_CHARS}}}$"))
        .expect("static revision pattern is valid")
});

/// Validates a single reference component.
///
/// With `is_version` set, a value that starts with `[` and ends with `]` is
/// accepted as a version range regardless of its content.
///
/// # Errors
///
/// Returns [`ReferenceError::InvalidName`] when the value is too short, too
/// long, starts with a forbidden character, contains characters outside the
/// allowed set, or (for versions) has unbalanced brackets.
///
/// # Examples
///
/// ```rust
/// use binpm::reference::validate_name;
///
/// assert!(validate_name("zlib", false).is_ok());
/// assert!(validate_name("*", false).is_ok());
/// assert!(validate_name("[>1.0 <2.0]", true).is_ok());
/// assert!(validate_name("-zlib", false).is_err());
/// ```
pub fn validate_name(value: &str, is_version: bool) -> Result<(), ReferenceError> {
    if value == "*" || NAME_PATTERN.is_match(value) {
        return Ok(());
    }
    if is_version && value.starts_with('[') && value.ends_with(']') {
        return Ok(());
    }
    Err(ReferenceError::InvalidName {
        value: value.to_string(),
        reason: invalid_name_reason(value),
    })
}

/// Validates a recipe or package revision.
pub fn validate_revision(value: &str) -> Result<(), ReferenceError> {
    if REVISION_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(ReferenceError::InvalidName {
            value: value.to_string(),
            reason: format!(
                "Valid revisions must contain between 1 and {MAX_CHARS} alphanumeric characters"
            ),
        })
    }
}

fn invalid_name_reason(value: &str) -> String {
    let length = value.chars().count();
    if length < MIN_CHARS {
        format!("is {length} characters long. Valid names must contain at least {MIN_CHARS} characters")
    } else if length > MAX_CHARS {
        format!("is {length} characters long. Valid names must contain at most {MAX_CHARS} characters")
    } else {
        "Valid names must start with a letter, a number or an underscore, and contain only \
         letters, numbers and the characters '_', '+', '.', '-'"
            .to_string()
    }
}
