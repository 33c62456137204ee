use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CiLocalError {
    #[error("Please open a project folder to use glci")]
    NoWorkspace,

    #[error(
        "No .gitlab-ci.yml file found in the root of your workspace ({} folders searched)",
        folders.len()
    )]
    NoCiFile { folders: Vec<PathBuf> },

    #[error("Failed to parse .gitlab-ci.yml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("No runnable jobs found in .gitlab-ci.yml")]
    EmptyJobSet,

    #[error("Failed to start {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No job '{0}' in the job tree")]
    UnknownJob(String),

    #[error("Job '{0}' has no run in progress")]
    NotRunning(String),

    #[error("Command timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CiLocalError {
    /// Whether this condition should be shown as a warning rather than an error.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::EmptyJobSet)
    }
}

pub type Result<T> = std::result::Result<T, CiLocalError>;
