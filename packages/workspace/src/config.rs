use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use std::time::Duration;

use crate::errors::ConfigError;
use crate::self_edit::DEFAULT_TOKEN_TTL;

pub const DEFAULT_CONFIG_NAME: &str = "tessera.config.json";

/// Project configuration, read from `tessera.config.json` at the project root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory names excluded from scans and watches
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Source file extensions, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// External formatter run on every written file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<FormatterConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    pub command: String,

    /// `{path}` is replaced by the path of the file being formatted
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_ignore() -> Vec<String> {
    ["node_modules", ".next", "build", "dist", ".git", ".next-prod"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_extensions() -> Vec<String> {
    vec!["jsx".to_string(), "tsx".to_string()]
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
            extensions: default_extensions(),
            debounce_ms: default_debounce_ms(),
            formatter: None,
        }
    }
}

impl Config {
    /// Load the config from a project root. A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(DEFAULT_CONFIG_NAME);
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Malformed { path, source })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Lifetime of a self-edit token. Spans many debounce windows so a slow
    /// watcher still sees its own writes.
    pub fn self_edit_ttl(&self) -> Duration {
        self.debounce().saturating_mul(20).max(DEFAULT_TOKEN_TTL)
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore.iter().any(|ignored| ignored == name)
    }

    pub fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }

    /// A source file under `root` that is not inside an ignored directory
    pub fn is_source_path(&self, root: &Path, path: &Path) -> bool {
        if !self.has_source_extension(path) {
            return false;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        !relative.components().any(|component| match component {
            Component::Normal(name) => name.to_str().map(|n| self.is_ignored_dir(n)).unwrap_or(false),
            _ => false,
        })
    }
}

impl FormatterConfig {
    pub fn args_for(&self, path: &Path) -> Vec<String> {
        let path = path.display().to_string();
        self.args.iter().map(|arg| arg.replace("{path}", &path)).collect()
    }
}
