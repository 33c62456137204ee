use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{CiLocalError, Result};

/// Pipeline file names, in lookup order.
pub const CI_FILE_NAMES: [&str; 2] = [".gitlab-ci.yml", ".gitlab-ci.yaml"];

/// The set of project folders commands operate on.
#[derive(Debug, Clone)]
pub struct Workspace {
    folders: Vec<PathBuf>,
}

/// A discovered pipeline file and the directory jobs run from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiFile {
    pub path: PathBuf,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self { folders }
    }

    /// Finds the pipeline file.
    ///
    /// Folders are searched in order and, within a folder, `.gitlab-ci.yml`
    /// wins over `.gitlab-ci.yaml`. The first hit is returned.
    ///
    /// # Errors
    ///
    /// Returns `NoWorkspace` when there are no folders and `NoCiFile` when no
    /// folder contains a pipeline file.
    pub fn find_ci_file(&self) -> Result<CiFile> {
        if self.folders.is_empty() {
            return Err(CiLocalError::NoWorkspace);
        }

        for folder in &self.folders {
            for name in CI_FILE_NAMES {
                let candidate = folder.join(name);
                debug!("Looking for {}", candidate.display());
                if candidate.is_file() {
                    // Jobs run with the CI file's folder as working directory,
                    // so relative folders must not leak into spawned paths.
                    let candidate = std::path::absolute(&candidate)?;
                    info!("Using pipeline file: {}", candidate.display());
                    return Ok(CiFile::new(candidate));
                }
            }
        }

        Err(CiLocalError::NoCiFile {
            folders: self.folders.clone(),
        })
    }
}

impl CiFile {
    fn new(path: PathBuf) -> Self {
        let root = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self { path, root }
    }
}
