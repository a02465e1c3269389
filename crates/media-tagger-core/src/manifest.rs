//! The pass manifest: a line-oriented durable work list.
//!
//! Presence and absence are themselves control signals. After a scan, an
//! absent manifest means "no eligible work found", which terminates the
//! video loop. The file is recreated each pass and removed once consumed.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
}

impl Manifest {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one media path. Creates the manifest if absent.
    pub fn append(&self, media_path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", media_path.display())?;
        Ok(())
    }

    /// Replace the manifest contents with the given paths
    pub fn replace(&self, paths: &[PathBuf]) -> Result<()> {
        let mut contents = String::new();
        for path in paths {
            contents.push_str(&path.display().to_string());
            contents.push('\n');
        }
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Load the listed paths, or `None` when the manifest is absent.
    ///
    /// A manifest that exists but cannot be read is an internal coordination
    /// error and is fatal to the current pass.
    pub fn load(&self) -> Result<Option<Vec<PathBuf>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Manifest(format!("{}: {}", self.path.display(), e))
        })?;
        let paths = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect();
        Ok(Some(paths))
    }

    /// Remove the manifest. Absence is not an error.
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
