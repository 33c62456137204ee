use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Top-level keys with pipeline-wide meaning. These are never job names.
pub const RESERVED_KEYWORDS: [&str; 12] = [
    "default",
    "image",
    "services",
    "stages",
    "types",
    "before_script",
    "after_script",
    "variables",
    "cache",
    "include",
    "workflow",
    "pages",
];

/// Rule used to decide which top-level keys of a pipeline document are jobs.
///
/// `Permissive` is what interactive selection uses: anything that is not
/// hidden and not reserved. `Strict` is what the job tree uses: only entries
/// whose value is a mapping with a `script` key. Hidden templates are never
/// runnable, so both rules drop them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobFilter {
    #[default]
    Permissive,
    Strict,
}

impl JobFilter {
    pub fn accepts(self, key: &str, value: &Value) -> bool {
        match self {
            Self::Permissive => !is_hidden(key) && !is_reserved(key),
            Self::Strict => !is_hidden(key) && has_script(value),
        }
    }
}

/// Keys starting with `.` are templates meant for `extends`, not runnable jobs.
pub fn is_hidden(key: &str) -> bool {
    key.starts_with('.')
}

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYWORDS.contains(&key)
}

pub(super) fn has_script(value: &Value) -> bool {
    value
        .as_mapping()
        .is_some_and(|mapping| mapping.contains_key("script"))
}
