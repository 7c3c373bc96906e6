use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use walkdir::WalkDir;

/// Ordered set of data directories that content files are resolved against.
///
/// Directories are searched in the order given; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct ContentCollection {
    directories: Vec<PathBuf>,
    fold_case: bool,
}

impl ContentCollection {
    pub fn new(directories: Vec<PathBuf>, fold_case: bool) -> Self {
        Self {
            directories,
            fold_case,
        }
    }

    /// Drops directories that do not exist on disk.
    pub fn filter_existing(mut self) -> Self {
        self.directories.retain(|dir| dir.is_dir());
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.directories
    }

    pub fn get_path(&self, file: &str) -> Result<PathBuf> {
        match self.lookup(file) {
            Some(path) => Ok(path),
            None => bail!("file {file} not found"),
        }
    }

    pub fn does_exist(&self, file: &str) -> bool {
        self.lookup(file).is_some()
    }

    /// Every file directly inside the data directories with the given
    /// extension (case-insensitive), sorted per directory.
    pub fn files_with_extension(&self, extension: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for dir in &self.directories {
            let mut files: Vec<PathBuf> = WalkDir::new(dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|res| res.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| {
                    path.extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| ext.eq_ignore_ascii_case(extension))
                        .unwrap_or(false)
                })
                .collect();
            files.sort();
            found.extend(files);
        }
        found
    }

    fn lookup(&self, file: &str) -> Option<PathBuf> {
        for dir in &self.directories {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.filter_map(|entry| entry.ok()) {
                let path = entry.path();
                if self.matches(&path, file) {
                    return Some(path);
                }
            }
        }
        None
    }

    fn matches(&self, path: &Path, file: &str) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        if self.fold_case {
            name.eq_ignore_ascii_case(file)
        } else {
            name == file
        }
    }
}
