use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use serde_yaml::{Mapping, Value};

use super::filter::{has_script, JobFilter};
use crate::error::Result;

/// A parsed `.gitlab-ci.yml`.
///
/// Holds the top-level entries in document order. A document whose top level
/// is not a mapping (empty file, scalar, sequence) has no entries, which
/// callers treat as "no jobs" rather than as an error.
#[derive(Debug, Clone, Default)]
pub struct PipelineDocument {
    entries: IndexMap<String, Value>,
}

/// A top-level entry that is a mapping with a `script` key.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDefinition {
    body: Mapping,
}

impl PipelineDocument {
    /// Parses pipeline YAML.
    ///
    /// # Errors
    ///
    /// Returns `CiLocalError::Parse` when the text is not valid YAML.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut root: Value = serde_yaml::from_str(text)?;
        root.apply_merge()?;

        let Value::Mapping(mapping) = root else {
            debug!("Pipeline document top level is not a mapping, no jobs");
            return Ok(Self::default());
        };

        let entries = mapping
            .into_iter()
            .filter_map(|(key, value)| key_to_string(&key).map(|key| (key, value)))
            .collect();

        Ok(Self { entries })
    }

    /// Reads and parses the pipeline file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a parse error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Top-level keys accepted by `filter`, in document order.
    pub fn job_names(&self, filter: JobFilter) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(key, value)| filter.accepts(key, value))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Jobs selected by the strict rule, keyed by name in document order.
    pub fn jobs(&self) -> IndexMap<String, JobDefinition> {
        self.entries
            .iter()
            .filter(|(key, value)| JobFilter::Strict.accepts(key, value))
            .filter_map(|(key, value)| {
                JobDefinition::from_value(value).map(|job| (key.clone(), job))
            })
            .collect()
    }
}

impl JobDefinition {
    fn from_value(value: &Value) -> Option<Self> {
        if !has_script(value) {
            return None;
        }
        value.as_mapping().map(|body| Self { body: body.clone() })
    }

    pub fn stage(&self) -> Option<&str> {
        self.body.get("stage").and_then(Value::as_str)
    }
}

/// Extracts job names from pipeline YAML text.
///
/// # Errors
///
/// Returns `CiLocalError::Parse` when the text is not valid YAML.
pub fn extract_job_names(text: &str, filter: JobFilter) -> Result<Vec<String>> {
    let names = PipelineDocument::parse(text)?.job_names(filter);
    debug!("{filter:?} filter selected {} jobs", names.len());
    Ok(names)
}

// Scalar keys are exposed as strings, the way a JavaScript YAML loader would.
fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}
