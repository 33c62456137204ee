use std::fmt;

use super::locator::RUNNER_NAME;

/// What to ask the external runner to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Run the whole pipeline.
    All,
    /// Only check the pipeline file.
    Validate,
    /// Run a single named job.
    Job(String),
}

impl Invocation {
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::All => Vec::new(),
            Self::Validate => vec!["--validate".to_string()],
            Self::Job(name) => vec![name.clone()],
        }
    }

    /// The job whose status this run decides, if any.
    pub fn job_name(&self) -> Option<&str> {
        match self {
            Self::Job(name) => Some(name),
            Self::All | Self::Validate => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Validate => "validate",
            Self::Job(name) => name,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{RUNNER_NAME} {}", self.args().join(" "))
    }
}
