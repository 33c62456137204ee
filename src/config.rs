use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pipeline::JobFilter;
use crate::runner::LineEnding;

/// Settings read from `glci.toml` (or `.json`, `.yaml`, `.yml`).
///
/// Command-line flags are applied on top after loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// How the external runner is launched
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Interactive job selection
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Terminal output preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunnerConfig {
    /// Path to the gitlab-ci-local executable
    pub executable: Option<PathBuf>,

    /// Kill the runner after this many seconds
    pub timeout_secs: Option<u64>,

    /// Line ending written to the terminal
    #[serde(default)]
    pub line_ending: LineEnding,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SelectionConfig {
    /// Rule used to build the job picker list
    #[serde(default)]
    pub filter: JobFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Colorize terminal output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Prefix runner output lines with the job name
    #[serde(default = "default_true")]
    pub prefix_output: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            prefix_output: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Config file names looked up in the current directory, in order.
const CONFIG_FILE_NAMES: [&str; 4] = ["glci.toml", "glci.json", "glci.yaml", "glci.yml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str())? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    fn parse(self, contents: &str) -> Result<Config> {
        let config = match self {
            Self::Toml => toml::from_str(contents)?,
            Self::Json => serde_json::from_str(contents)?,
            Self::Yaml => serde_yaml::from_str(contents)?,
        };
        Ok(config)
    }
}

impl Config {
    /// Loads `path` if given, otherwise the first of `glci.toml`, `glci.json`,
    /// `glci.yaml` and `glci.yml` found in the current directory. Without a
    /// config file every setting has its default.
    ///
    /// # Errors
    ///
    /// An explicit path that cannot be read, or any file that does not parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let found = path.map(Path::to_path_buf).or_else(|| {
            CONFIG_FILE_NAMES
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.is_file())
        });

        match found {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                Self::load_from_path(&path)
            }
            None => Ok(Self::default()),
        }
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // Unknown extensions get every format in turn.
        let parsed = match ConfigFormat::from_path(path) {
            Some(format) => format.parse(&contents),
            None => [ConfigFormat::Toml, ConfigFormat::Json, ConfigFormat::Yaml]
                .into_iter()
                .find_map(|format| format.parse(&contents).ok())
                .ok_or_else(|| anyhow!("no supported format matched")),
        };

        parsed.with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
