//! Awaited path and the directory that gets watched

use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPath {
    path: PathBuf,
    parent: PathBuf,
}

impl TargetPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let parent = parent_dir(&path);
        Self { path, parent }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the target, as `dirname(3)` would report it
    pub fn parent(&self) -> &Path {
        &self.parent
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    // Path::parent already ignores trailing separators and `.` components
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
        Some(parent) => parent.to_path_buf(),
        None if path.has_root() => PathBuf::from(Component::RootDir.as_os_str()),
        None => PathBuf::from("."),
    }
}
