//! Include path resolution
//!
//! The linker owns every source file the preprocessor sees and hands out
//! integer file ids. `"…"` includes resolve against the including file's
//! directory first, then the user include directories; `<…>` includes
//! resolve against the system include directories only. Tests register
//! virtual files instead of touching the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkerError {
    #[error("cannot read {0}: {1}")]
    Io(PathBuf, io::Error),
}

#[derive(Debug, Default)]
pub struct Linker {
    user_dirs: Vec<PathBuf>,
    system_dirs: Vec<PathBuf>,
    files: Vec<(PathBuf, String)>,
}

impl Linker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user_dir(&mut self, dir: PathBuf) {
        self.user_dirs.push(dir);
    }

    pub fn add_system_dir(&mut self, dir: PathBuf) {
        self.system_dirs.push(dir);
    }

    /// Read a file from disk and register it
    pub fn add_file(&mut self, path: &Path) -> Result<usize, LinkerError> {
        let content =
            fs::read_to_string(path).map_err(|e| LinkerError::Io(path.to_path_buf(), e))?;
        Ok(self.register(path.to_path_buf(), content))
    }

    /// Register in-memory content under a path (root sources, tests)
    pub fn register(&mut self, path: PathBuf, content: String) -> usize {
        self.files.push((path, content));
        self.files.len() - 1
    }

    /// Resolve a `"…"` include relative to the including file, then the
    /// user include directories, then as given
    pub fn search_internal(&mut self, path: &str, from: Option<usize>) -> Option<usize> {
        if let Some(id) = self.search_registered(path) {
            return Some(id);
        }
        let mut candidates = Vec::new();
        if let Some(from) = from {
            if let Some(parent) = self.files[from].0.parent() {
                candidates.push(parent.join(path));
            }
        }
        for dir in &self.user_dirs {
            candidates.push(dir.join(path));
        }
        candidates.push(PathBuf::from(path));
        self.search_candidates(candidates)
    }

    /// Resolve a `<…>` include against the system include directories
    pub fn search_external(&mut self, path: &str) -> Option<usize> {
        if let Some(id) = self.search_registered(path) {
            return Some(id);
        }
        let candidates = self
            .system_dirs
            .iter()
            .map(|dir| dir.join(path))
            .collect();
        self.search_candidates(candidates)
    }

    fn search_registered(&self, path: &str) -> Option<usize> {
        self.files
            .iter()
            .position(|(registered, _)| registered == Path::new(path))
    }

    fn search_candidates(&mut self, candidates: Vec<PathBuf>) -> Option<usize> {
        for candidate in candidates {
            if candidate.is_file() {
                if let Ok(id) = self.add_file(&candidate) {
                    return Some(id);
                }
            }
        }
        None
    }

    pub fn content(&self, id: usize) -> &str {
        &self.files[id].1
    }

    pub fn filename(&self, id: usize) -> String {
        self.files[id].0.display().to_string()
    }
}
