//! Migration file discovery

use crate::migration::error::{MigrationError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A file found in the migrations directory, not yet resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// File name, which is also the migration name (`001_init.sql`)
    pub name: String,
    pub path: PathBuf,
    /// Lower-cased extension without the dot
    pub extension: String,
}

impl DiscoveredFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_name()?.to_str()?.to_string();
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        Some(Self {
            name,
            path,
            extension,
        })
    }
}

/// Lists candidate migration files in a base directory
pub trait Discover: Send + Sync {
    /// Files directly inside `base_dir` whose extension is one of `extensions`
    fn discover(&self, base_dir: &Path, extensions: &[&str]) -> Result<Vec<DiscoveredFile>>;
}

/// Non-recursive directory listing
///
/// Subdirectories (including `down/`, which holds SQL rollbacks) are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryDiscovery;

impl Discover for DirectoryDiscovery {
    fn discover(&self, base_dir: &Path, extensions: &[&str]) -> Result<Vec<DiscoveredFile>> {
        if !base_dir.is_dir() {
            return Err(MigrationError::DirectoryNotFound(base_dir.to_path_buf()));
        }

        let entries = fs::read_dir(base_dir).map_err(MigrationError::io(base_dir))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(MigrationError::io(base_dir))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(file) = DiscoveredFile::from_path(path) else {
                continue;
            };
            if extensions.iter().any(|ext| *ext == file.extension) {
                files.push(file);
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}
