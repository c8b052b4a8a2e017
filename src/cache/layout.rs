//! On-disk layout shared by the package cache and `file://` remotes.
//!
//! ```text
//! {root}/
//! ├── .locks/
//! │   └── zlib-1.2.11-conan-stable-9e186f6d.lock
//! └── zlib/1.2.11/conan/stable/
//!     ├── metadata.json
//!     ├── export/
//!     │   └── conanmanifest.txt
//!     └── package/
//!         ├── 9e186f6d/
//!         │   ├── conaninfo.txt
//!         │   └── conanmanifest.txt
//!         └── 9e186f6d.dirty
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::reference::{PackageReference, RecipeReference};

/// Redirection file left in a package folder stored under a short path.
pub const SHORT_PATH_LINK: &str = ".conan_link";

/// Folder of a recipe (revision is not part of the layout).
pub fn recipe_dir(root: &Path, reference: &RecipeReference) -> PathBuf {
    root.join(reference.name())
        .join(sanitize(reference.version()))
        .join(reference.user())
        .join(reference.channel())
}

/// Folder holding the exported recipe and its manifest.
pub fn export_dir(root: &Path, reference: &RecipeReference) -> PathBuf {
    recipe_dir(root, reference).join("export")
}

/// Folder of one binary package.
pub fn package_dir(root: &Path, package: &PackageReference) -> PathBuf {
    recipe_dir(root, package.recipe()).join("package").join(package.package_id())
}

/// Marker whose presence means `folder` was left half written.
pub fn dirty_flag(folder: &Path) -> PathBuf {
    let mut flag = OsString::from(folder.as_os_str());
    flag.push(".dirty");
    PathBuf::from(flag)
}

/// File name (without directory) of the lock guarding one package folder.
pub fn lock_name(package: &PackageReference) -> String {
    let recipe = package.recipe();
    sanitize(&format!(
        "{}-{}-{}-{}-{}",
        recipe.name(),
        recipe.version(),
        recipe.user(),
        recipe.channel(),
        package.package_id()
    ))
}

/// Replaces characters that are not safe in file names (version ranges may
/// contain `<`, `>`, `|`, spaces).
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
