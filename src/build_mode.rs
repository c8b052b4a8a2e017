//! Build-mode policy derived from the `--build` arguments.
//!
//! | Arguments              | Effect                                          |
//! |------------------------|-------------------------------------------------|
//! | (no `--build`)         | nothing is forced, missing binaries are errors  |
//! | `--build`              | every package is built from source              |
//! | `--build=missing`      | build whatever has no binary available          |
//! | `--build=outdated`     | rebuild binaries made from another recipe hash  |
//! | `--build=never`        | never build, not even `build_policy = always`   |
//! | `--build=zlib*`        | glob over the name or `name/version@user/channel` |

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::core::BinpmError;
use crate::graph::Recipe;
use crate::reference::RecipeReference;

/// Build policy a recipe can declare for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPolicy {
    /// Build from source when no binary is available.
    Missing,
    /// Always build from source.
    Always,
}

/// Which packages are built from source.
#[derive(Debug, Clone, Default)]
pub struct BuildMode {
    patterns: Vec<Pattern>,
    all: bool,
    missing: bool,
    outdated: bool,
    never: bool,
}

impl BuildMode {
    /// Interprets the `--build` values.
    ///
    /// `None` means the option was not given at all, while an empty list is
    /// a bare `--build` and forces every package.
    ///
    /// # Errors
    ///
    /// Returns [`BinpmError::BuildModeConflict`] when `never` is combined
    /// with any other value and [`BinpmError::InvalidBuildPattern`] for
    /// patterns that are not valid globs.
    pub fn new(params: Option<&[String]>) -> Result<Self, BinpmError> {
        let mut mode = Self::default();
        let Some(params) = params else {
            return Ok(mode);
        };
        if params.is_empty() {
            mode.all = true;
            return Ok(mode);
        }

        for param in params {
            match param.as_str() {
                "missing" => mode.missing = true,
                "outdated" => mode.outdated = true,
                "never" => mode.never = true,
                pattern => {
                    let compiled =
                        Pattern::new(pattern).map_err(|e| BinpmError::InvalidBuildPattern {
                            pattern: pattern.to_string(),
                            reason: e.to_string(),
                        })?;
                    mode.patterns.push(compiled);
                }
            }
        }

        if mode.never && (mode.missing || mode.outdated || !mode.patterns.is_empty()) {
            return Err(BinpmError::BuildModeConflict {
                message: "--build=never is not compatible with other build options".to_string(),
            });
        }
        Ok(mode)
    }

    /// Whether `--build=missing` was given.
    pub const fn missing(&self) -> bool {
        self.missing
    }

    /// Whether `--build=outdated` was given.
    pub const fn outdated(&self) -> bool {
        self.outdated
    }

    /// Whether the package must be built from source regardless of what
    /// binaries exist.
    pub fn forced(&self, recipe: &Recipe, reference: &RecipeReference) -> bool {
        if self.never {
            return false;
        }
        if self.all || recipe.build_policy == Some(BuildPolicy::Always) {
            return true;
        }
        self.matching_pattern(reference).is_some()
    }

    /// Whether building from source is acceptable when no binary exists.
    pub fn allowed(&self, recipe: &Recipe, reference: &RecipeReference) -> bool {
        self.missing
            || self.outdated
            || self.forced(recipe, reference)
            || recipe.build_policy == Some(BuildPolicy::Missing)
    }

    /// Patterns that matched none of `references`.
    pub fn unmatched_patterns<'a>(
        &self,
        references: impl IntoIterator<Item = &'a RecipeReference> + Clone,
    ) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|pattern| {
                !references.clone().into_iter().any(|reference| pattern_matches(pattern, reference))
            })
            .map(|pattern| pattern.as_str().to_string())
            .collect()
    }

    fn matching_pattern(&self, reference: &RecipeReference) -> Option<&Pattern> {
        self.patterns.iter().find(|pattern| pattern_matches(pattern, reference))
    }
}

fn pattern_matches(pattern: &Pattern, reference: &RecipeReference) -> bool {
    pattern.matches(reference.name()) || pattern.matches(&reference.without_revision().to_string())
}
