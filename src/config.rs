//! `.dynwraprc` configuration

use crate::errors::{Error, Result};
use crate::interop::{platform_extensions, Library, Resolver, DEFAULT_PREFIXES};
use crate::logging::{LogConfig, LogFormat, LogOutput};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn, Level};

/// File names checked in each directory, in order
pub const CONFIG_FILES: &[&str] = &[".dynwraprc", ".dynwraprc.toml"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directories searched when a call names no explicit path
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Write daily-rotated files here instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            prefixes: default_prefixes(),
            extensions: default_extensions(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            filter: None,
            directory: None,
        }
    }
}

fn default_prefixes() -> Vec<String> {
    DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect()
}

fn default_extensions() -> Vec<String> {
    platform_extensions().iter().map(|s| s.to_string()).collect()
}

fn default_level() -> String {
    "info".to_string()
}

impl LibraryConfig {
    /// Resolver using the configured prefixes and extensions
    pub fn resolver(&self) -> Resolver {
        Resolver::new()
            .with_prefixes(self.prefixes.iter().cloned())
            .with_extensions(self.extensions.iter().cloned())
    }

    /// Resolve `name` in `path`, or across `search_paths` when no path is given
    pub fn resolve(&self, name: &str, path: Option<&Path>) -> Result<Library> {
        let resolver = self.resolver();
        match path {
            Some(dir) => resolver.resolve(name, dir),
            None if self.search_paths.is_empty() => resolver.resolve(name, "."),
            None => resolver.resolve_any(name, self.search_paths.as_slice()),
        }
    }
}

impl LoggingConfig {
    pub fn to_log_config(&self) -> Result<LogConfig> {
        let level: Level = self
            .level
            .parse()
            .map_err(|_| Error::Config(format!("Invalid log level '{}'", self.level)))?;

        let mut config = LogConfig::new().with_level(level).with_format(self.format);
        if let Some(filter) = &self.filter {
            config = config.with_filter(filter.clone());
        }
        if let Some(dir) = &self.directory {
            config = config.with_output(LogOutput::File {
                directory: dir.clone(),
                prefix: "dynwrap".to_string(),
            });
        }
        Ok(config)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Find and load configuration from the current directory or its parents
    pub fn discover() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::discover_from(&dir),
            Err(_) => Self::default(),
        }
    }

    /// Walk upward from `start`; the first readable config file wins
    pub fn discover_from(start: &Path) -> Self {
        let mut current = Some(start);

        while let Some(dir) = current {
            for file in CONFIG_FILES {
                let config_path = dir.join(file);
                if !config_path.is_file() {
                    continue;
                }
                match Self::load(&config_path) {
                    Ok(config) => {
                        debug!(path = %config_path.display(), "loaded config");
                        return config;
                    }
                    Err(e) => warn!("Ignoring {}: {}", config_path.display(), e),
                }
            }
            current = dir.parent();
        }

        Self::default()
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))
    }
}
