//! Rewrite configuration.
//!
//! Defaults, optionally overlaid by a TOML file and then by `QUILL_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Iteration cap `ReplaceRepeated` uses unless told otherwise.
pub const DEFAULT_MAX_ITERATIONS: usize = 65535;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// `MaxIterations` for `ReplaceRepeated`; `None` is unbounded.
    pub max_iterations: Option<usize>,
    /// `Heads` option for `Replace`.
    pub heads: bool,
    /// Result cap for `ReplaceList`; `None` keeps every result.
    pub max_results: Option<usize>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            heads: false,
            max_results: None,
        }
    }
}

impl RewriteConfig {
    /// Load configuration from file, falling back to defaults for missing values
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let toml_content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), toml_content)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Applies `QUILL_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("QUILL_MAX_ITERATIONS") {
            if let Some(limit) = parse_limit(&val) {
                self.max_iterations = limit;
            }
        }

        if let Some(val) = lookup("QUILL_REPLACE_HEADS") {
            if let Ok(heads) = val.parse::<bool>() {
                self.heads = heads;
            }
        }

        if let Some(val) = lookup("QUILL_MAX_RESULTS") {
            if let Some(limit) = parse_limit(&val) {
                self.max_results = limit;
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_iterations == Some(0) {
            return Err(ConfigError::Validation(
                "max_iterations must be greater than 0 (omit it for no limit)".to_string(),
            ));
        }
        Ok(())
    }
}

/// A count, or `Infinity`/`none` for no limit.
fn parse_limit(val: &str) -> Option<Option<usize>> {
    match val.trim() {
        v if v.eq_ignore_ascii_case("infinity") || v.eq_ignore_ascii_case("none") => Some(None),
        v => v.parse::<usize>().ok().map(Some),
    }
}
