//! Safety checks for storage references.
//!
//! A reference is a storage-relative path or key supplied by a caller. The
//! same checks run in the validator and again inside the local storage
//! backend, so an unvalidated reference can never escape the storage root.

use std::path::{Component, Path, PathBuf};

/// Why a reference was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathViolation {
    Traversal,
    NulByte,
    Absolute,
    Empty,
}

impl PathViolation {
    pub fn describe(&self) -> &'static str {
        match self {
            PathViolation::Traversal => "contains a parent-directory ('..') segment",
            PathViolation::NulByte => "contains an embedded NUL byte",
            PathViolation::Absolute => "absolute paths are not permitted",
            PathViolation::Empty => "must not be empty",
        }
    }
}

/// Check a storage reference for traversal and injection defects.
///
/// `allow_absolute` permits absolute paths for trusted/local invocations;
/// the default everywhere in this crate is `false`. Parent-directory
/// segments are refused unconditionally, even ones that would normalize
/// back inside the root.
pub fn check_reference(reference: &str, allow_absolute: bool) -> Result<(), PathViolation> {
    if reference.is_empty() {
        return Err(PathViolation::Empty);
    }
    if reference.contains('\0') {
        return Err(PathViolation::NulByte);
    }

    let path = Path::new(reference);
    if path.is_absolute() && !allow_absolute {
        return Err(PathViolation::Absolute);
    }

    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(PathViolation::Traversal);
        }
    }

    Ok(())
}

/// Normalize a checked reference into a path relative to `root`, dropping
/// `.` segments and any root/prefix component. Callers must have run
/// [`check_reference`] first; this never steps above `root`.
pub fn resolve_under_root(root: &Path, reference: &str) -> PathBuf {
    let mut resolved = root.to_path_buf();
    for component in Path::new(reference).components() {
        if let Component::Normal(part) = component {
            resolved.push(part);
        }
    }
    resolved
}
