use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

/// File identifier → local path, filled in while game files are fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFiles {
    paths: BTreeMap<String, PathBuf>,
}

impl ResolvedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, path: PathBuf) {
        self.paths.insert(id.into(), path);
    }

    pub fn get(&self, id: &str) -> Option<&Path> {
        self.paths.get(id).map(PathBuf::as_path)
    }

    /// Like `get`, but an unknown identifier is an error.
    pub fn require(&self, id: &str) -> LauncherResult<&Path> {
        self.get(id)
            .ok_or_else(|| LauncherError::UnknownFile(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Everything an install action may touch.
pub struct ActionContext<'a> {
    pub game_dir: &'a Path,
    /// Stands in for the process working directory of a shell installer.
    pub working_dir: &'a Path,
    /// Substituted for `homedir` in move destinations.
    pub home_dir: &'a Path,
    /// Where moves go when their destination does not exist.
    pub fallback_dir: &'a Path,
    pub files: &'a ResolvedFiles,
}
