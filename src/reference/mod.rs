//! Recipe and package references.
//!
//! A [`RecipeReference`] names one recipe version published by a user on a
//! channel, optionally pinned to a revision:
//!
//! ```text
//! zlib/1.2.11@conan/stable#a1b2c3
//! ```
//!
//! A [`PackageReference`] names one binary variant of that recipe, identified
//! by its package id, optionally pinned to a package revision:
//!
//! ```text
//! zlib/1.2.11@conan/stable#a1b2c3:9e186f6d94c008b544af1569d1a6368d8339efc5#77
//! ```
//!
//! Both types are immutable values. Strict equality (`==`, `Hash`) compares
//! every field including revisions; [`RecipeReference::matches_with_ref`] is
//! the lenient comparison that treats a missing revision as a wildcard.

mod name;

pub use name::{MAX_CHARS, MIN_CHARS, validate_name, validate_revision};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while validating or parsing references.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// A single component violates the identifier grammar
    #[error("Value provided, '{value}', {reason}")]
    InvalidName {
        /// The offending component
        value: String,
        /// Human readable explanation
        reason: String,
    },

    /// The reference text does not have the expected shape
    #[error("Wrong reference '{text}': {reason}")]
    InvalidReference {
        /// The full text that failed to parse
        text: String,
        /// Human readable explanation
        reason: String,
    },
}

/// Reference to a recipe: `name/version@user/channel[#revision]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipeReference {
    name: String,
    version: String,
    user: String,
    channel: String,
    revision: Option<String>,
}

impl RecipeReference {
    /// Builds a reference from its components, validating each one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use binpm::reference::RecipeReference;
    ///
    /// let r = RecipeReference::new("opencv", "2.3", "lasote", "testing", Some("34"))?;
    /// assert_eq!(r.revision(), Some("34"));
    /// assert_eq!(r.to_string(), "opencv/2.3@lasote/testing#34");
    /// # Ok::<(), binpm::reference::ReferenceError>(())
    /// ```
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        user: impl Into<String>,
        channel: impl Into<String>,
        revision: Option<&str>,
    ) -> Result<Self, ReferenceError> {
        let reference = Self {
            name: name.into(),
            version: version.into(),
            user: user.into(),
            channel: channel.into(),
            revision: revision.map(str::to_string),
        };
        reference.validate()?;
        Ok(reference)
    }

    fn validate(&self) -> Result<(), ReferenceError> {
        validate_name(&self.name, false)?;
        validate_name(&self.version, true)?;
        validate_name(&self.user, false)?;
        validate_name(&self.channel, false)?;
        if let Some(revision) = &self.revision {
            validate_revision(revision)?;
        }
        Ok(())
    }

    /// Package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version, or a bracketed version range.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Publishing user.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Publishing channel.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Recipe revision, if pinned.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Returns a copy of this reference without its revision.
    #[must_use]
    pub fn without_revision(&self) -> Self {
        Self {
            revision: None,
            ..self.clone()
        }
    }

    /// Returns a copy of this reference pinned to `revision`.
    pub fn with_revision(&self, revision: &str) -> Result<Self, ReferenceError> {
        validate_revision(revision)?;
        Ok(Self {
            revision: Some(revision.to_string()),
            ..self.clone()
        })
    }

    /// Lenient comparison used when matching an installed reference against a
    /// requested one.
    ///
    /// Name, version, user and channel must be equal. Revisions are compared
    /// only when both sides carry one; a missing revision on either side acts
    /// as a wildcard.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use binpm::reference::RecipeReference;
    ///
    /// let plain: RecipeReference = "opencv/2.4.10@user/testing".parse()?;
    /// let r1: RecipeReference = "opencv/2.4.10@user/testing#R1".parse()?;
    /// let r2: RecipeReference = "opencv/2.4.10@user/testing#R2".parse()?;
    ///
    /// assert!(r1.matches_with_ref(&plain));
    /// assert!(plain.matches_with_ref(&r1));
    /// assert!(!r1.matches_with_ref(&r2));
    /// # Ok::<(), binpm::reference::ReferenceError>(())
    /// ```
    pub fn matches_with_ref(&self, other: &Self) -> bool {
        if self.name != other.name
            || self.version != other.version
            || self.user != other.user
            || self.channel != other.channel
        {
            return false;
        }
        match (&self.revision, &other.revision) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => true,
        }
    }
}

impl fmt::Display for RecipeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}/{}", self.name, self.version, self.user, self.channel)?;
        if let Some(revision) = &self.revision {
            write!(f, "#{revision}")?;
        }
        Ok(())
    }
}

impl FromStr for RecipeReference {
    type Err = ReferenceError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let wrong = |reason: &str| ReferenceError::InvalidReference {
            text: text.to_string(),
            reason: format!("{reason}. Write something like 'name/version@user/channel'"),
        };

        let mut halves = compact.split('@');
        let (Some(left), Some(right), None) = (halves.next(), halves.next(), halves.next()) else {
            return Err(wrong("exactly one '@' is required"));
        };

        let (name, version) = split_pair(left).ok_or_else(|| wrong("missing 'name/version'"))?;

        let (user_channel, revision) = match right.split_once('#') {
            Some((_, "")) => return Err(wrong("empty revision after '#'")),
            Some((user_channel, revision)) => (user_channel, Some(revision)),
            None => (right, None),
        };
        let (user, channel) =
            split_pair(user_channel).ok_or_else(|| wrong("missing 'user/channel'"))?;

        Self::new(name, version, user, channel, revision)
    }
}

/// Splits `a/b` into its two non-empty halves; any other shape is rejected.
fn split_pair(text: &str) -> Option<(&str, &str)> {
    let (first, second) = text.split_once('/')?;
    if first.is_empty() || second.is_empty() || second.contains('/') {
        return None;
    }
    Some((first, second))
}

/// Reference to one binary package of a recipe:
/// `name/version@user/channel[#rrev]:package_id[#prev]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageReference {
    recipe: RecipeReference,
    package_id: String,
    revision: Option<String>,
}

impl PackageReference {
    /// Creates a package reference without a package revision.
    pub fn new(
        recipe: RecipeReference,
        package_id: impl Into<String>,
    ) -> Result<Self, ReferenceError> {
        let package_id = package_id.into();
        validate_package_id(&package_id)?;
        Ok(Self {
            recipe,
            package_id,
            revision: None,
        })
    }

    /// Returns a copy pinned to a package revision.
    pub fn with_revision(&self, revision: &str) -> Result<Self, ReferenceError> {
        validate_revision(revision)?;
        Ok(Self {
            revision: Some(revision.to_string()),
            ..self.clone()
        })
    }

    /// The recipe this package was built from.
    pub fn recipe(&self) -> &RecipeReference {
        &self.recipe
    }

    /// Content-derived identifier of the binary configuration.
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// Package revision, if pinned.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }
}

fn validate_package_id(package_id: &str) -> Result<(), ReferenceError> {
    let forbidden = |c: char| c.is_whitespace() || matches!(c, ':' | '#' | '@' | '/' | '\\');
    if package_id.is_empty() || package_id.contains(forbidden) {
        return Err(ReferenceError::InvalidName {
            value: package_id.to_string(),
            reason: "is not a valid package id".to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.recipe, self.package_id)?;
        if let Some(revision) = &self.revision {
            write!(f, "#{revision}")?;
        }
        Ok(())
    }
}

impl FromStr for PackageReference {
    type Err = ReferenceError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        let (recipe, package) =
            trimmed.split_once(':').ok_or_else(|| ReferenceError::InvalidReference {
                text: text.to_string(),
                reason: "missing ':package_id'. Write something like \
                         'name/version@user/channel:package_id'"
                    .to_string(),
            })?;

        let recipe: RecipeReference = recipe.trim().parse()?;
        let package = package.trim();
        match package.split_once('#') {
            Some((package_id, revision)) => Self::new(recipe, package_id)?.with_revision(revision),
            None => Self::new(recipe, package),
        }
    }
}

macro_rules! string_serde {
    ($ty:ty, $expecting:literal) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(|e| {
                    serde::de::Error::custom(format!("invalid {}: {e}", $expecting))
                })
            }
        }
    };
}

string_serde!(RecipeReference, "recipe reference");
string_serde!(PackageReference, "package reference");
