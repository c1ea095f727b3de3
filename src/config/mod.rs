//! Configuration module for repotag
//!
//! Configuration is stored in the user's config directory
//! (`~/.config/repotag/config.toml` on Linux). Any field can be overridden
//! with an environment variable prefixed `REPOTAG_`, e.g.
//! `REPOTAG_FUZZY_THRESHOLD=0.9`.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::query::DEFAULT_FUZZY_THRESHOLD;
use crate::records::expand_home;

/// Output format of the `query` command
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// Aligned, colored columns
    Table,
    /// Comma-separated values with a header row
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jsonl" | "json" => Ok(Self::Jsonl),
            "table" => Ok(Self::Table),
            "csv" => Ok(Self::Csv),
            _ => Err(format!("unknown output format '{s}' (expected jsonl, table or csv)")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Jsonl => "jsonl",
            Self::Table => "table",
            Self::Csv => "csv",
        })
    }
}

/// Keys accepted by `config get` / `config set`
pub const CONFIG_KEYS: [&str; 7] = [
    "repository_directories",
    "recursive",
    "fuzzy_threshold",
    "tag_store",
    "metadata_store",
    "quiet",
    "output_format",
];

/// Application configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RepotagConfig {
    /// Directories scanned for git repositories (`~` is expanded)
    pub repository_directories: Vec<String>,

    /// Walk repository directories recursively instead of one level deep
    pub recursive: bool,

    /// Similarity threshold for `~=` and text search, in `[0, 1]`
    pub fuzzy_threshold: f64,

    /// Explicit tag store file; defaults to `tags.json` in the config directory
    pub tag_store: Option<PathBuf>,

    /// Upstream metadata store; defaults to `metadata.json` in the config directory
    pub metadata_store: Option<PathBuf>,

    /// Suppress informational output by default
    pub quiet: bool,

    /// Default output format of `query`
    pub output_format: OutputFormat,
}

impl Default for RepotagConfig {
    fn default() -> Self {
        Self {
            repository_directories: vec!["~/github".to_string()],
            recursive: false,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            tag_store: None,
            metadata_store: None,
            quiet: false,
            output_format: OutputFormat::default(),
        }
    }
}

impl RepotagConfig {
    /// Directory holding the config file and the default data files
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the system config directory cannot be determined.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::Message("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("repotag"))
    }

    /// Get the path to the config file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the system config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file cannot be read, parsed, or created.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file cannot be read, parsed, or created.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config not found, writing defaults");
            Self::default().save_to(path)?;
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix("REPOTAG")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("repository_directories"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration cannot be written.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config directory cannot be created, the configuration
    /// cannot be serialized to TOML, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Message(format!("Failed to create config directory: {e}")))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::Message(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(ConfigError::Message(format!(
                "fuzzy_threshold must be between 0 and 1, got {}",
                self.fuzzy_threshold
            )));
        }
        Ok(())
    }

    /// Tag store path, configured or default
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no path is configured and the config directory is unknown.
    pub fn tag_store_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.tag_store {
            Some(path) => Ok(expand_home(&path.to_string_lossy())),
            None => Ok(Self::config_dir()?.join("tags.json")),
        }
    }

    /// Metadata store path, configured or default
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no path is configured and the config directory is unknown.
    pub fn metadata_store_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.metadata_store {
            Some(path) => Ok(expand_home(&path.to_string_lossy())),
            None => Ok(Self::config_dir()?.join("metadata.json")),
        }
    }

    /// Render a single setting for `config get`
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<String> {
        let value = match key {
            "repository_directories" => self.repository_directories.join(","),
            "recursive" => self.recursive.to_string(),
            "fuzzy_threshold" => self.fuzzy_threshold.to_string(),
            "tag_store" => self
                .tag_store
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            "metadata_store" => self
                .metadata_store
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            "quiet" => self.quiet.to_string(),
            "output_format" => self.output_format.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Update a single setting from its string form (does not save)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unknown keys or values that do not parse.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |expected: &str| {
            ConfigError::Message(format!("Invalid value for {key}: '{value}'. Expected {expected}"))
        };

        match key {
            "repository_directories" => {
                self.repository_directories = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            "recursive" => self.recursive = value.parse().map_err(|_| invalid("'true' or 'false'"))?,
            "quiet" => self.quiet = value.parse().map_err(|_| invalid("'true' or 'false'"))?,
            "fuzzy_threshold" => {
                let threshold: f64 = value.parse().map_err(|_| invalid("a number between 0 and 1"))?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(invalid("a number between 0 and 1"));
                }
                self.fuzzy_threshold = threshold;
            }
            "tag_store" => self.tag_store = (!value.is_empty()).then(|| PathBuf::from(value)),
            "metadata_store" => self.metadata_store = (!value.is_empty()).then(|| PathBuf::from(value)),
            "output_format" => {
                self.output_format = value.parse().map_err(|_| invalid("jsonl, table or csv"))?;
            }
            _ => {
                return Err(ConfigError::Message(format!(
                    "Unknown configuration key: '{key}'. Available keys: {}",
                    CONFIG_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }
}
