//! Normalized absolute paths.
//!
//! Two references to the same file compare equal once normalized even if they were spelled
//! differently (`./lib/../lib/Core.dll` and `lib/Core.dll`). Normalization is lexical and
//! never touches the file system, so paths that don't exist (yet) normalize just fine.

use std::{
    ffi::OsStr,
    fmt,
    ops::Deref,
    path::{Component, Path, PathBuf},
};

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct NormalizedPathBuf(PathBuf);

impl NormalizedPathBuf {
    /// Make the path absolute relative to `base` and resolve `.` and `..` components.
    ///
    /// A `..` at the root is dropped.
    pub fn new(path: impl AsRef<Path>, base: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let joined;
        let path = if path.is_absolute() {
            path
        } else {
            joined = base.as_ref().join(path);
            &joined
        };

        let mut normalized = PathBuf::new();

        for component in path.components() {
            match component {
                Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                    normalized.push(component);
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if normalized.parent().is_some() {
                        normalized.pop();
                    }
                }
            }
        }

        Self(normalized)
    }

    pub fn as_path(&self) -> &Path {
        self
    }
}

impl fmt::Debug for NormalizedPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for NormalizedPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

impl Deref for NormalizedPathBuf {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for NormalizedPathBuf {
    fn as_ref(&self) -> &Path {
        self
    }
}

impl AsRef<OsStr> for NormalizedPathBuf {
    fn as_ref(&self) -> &OsStr {
        self.as_os_str()
    }
}
