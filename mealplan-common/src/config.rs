//! Configuration loading and root folder resolution
//!
//! Everything the meal planner keeps on disk (SQLite database, anonymous
//! session, household key, categorizer model) lives under a single root
//! folder. Missing or unreadable config files never abort startup; the
//! compiled defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MEALPLAN_ROOT";

/// Default confidence a classifier prediction must reach to be used
pub const DEFAULT_CATEGORY_THRESHOLD: f64 = 0.6;

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "mealplan_store=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Categorizer section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizerConfig {
    /// Lexicon file; relative paths resolve against the root folder.
    /// `None` uses the built-in lexicon.
    pub model_path: Option<PathBuf>,
    pub threshold: f64,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            threshold: DEFAULT_CATEGORY_THRESHOLD,
        }
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub event_bus_capacity: usize,
    pub logging: LoggingConfig,
    pub categorizer: CategorizerConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            event_bus_capacity: 256,
            logging: LoggingConfig::default(),
            categorizer: CategorizerConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else the platform config file, else defaults
    ///
    /// An explicitly requested file must exist and parse; the implicit
    /// platform file degrades to defaults with a warning.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match default_config_file() {
            Some(path) if path.exists() => match Self::from_file(&path) {
                Ok(config) => Ok(config),
                Err(e) => {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                    Ok(Self::default())
                }
            },
            _ => {
                debug!("No config file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.categorizer.threshold) {
            return Err(Error::Config(format!(
                "categorizer.threshold must be within [0, 1], got {}",
                self.categorizer.threshold
            )));
        }
        if self.event_bus_capacity == 0 {
            return Err(Error::Config(
                "event_bus_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform config file location (`~/.config/mealplan/config.toml` on Linux)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mealplan").join("config.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mealplan"))
        .unwrap_or_else(|| PathBuf::from("./mealplan_data"))
}

/// Root folder resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable `MEALPLAN_ROOT`
/// 3. `root_folder` from the TOML config
/// 4. OS-dependent compiled default (fallback)
pub struct RootFolderResolver<'a> {
    cli_arg: Option<&'a Path>,
    config: &'a TomlConfig,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new(cli_arg: Option<&'a Path>, config: &'a TomlConfig) -> Self {
        Self { cli_arg, config }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = self.cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.config.root_folder {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder and names the files inside it
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join("mealplan.db")
    }

    /// Anonymous session identity
    pub fn session_path(&self) -> PathBuf {
        self.root.join("session")
    }

    /// Locally stored household key
    pub fn household_key_path(&self) -> PathBuf {
        self.root.join("household_key")
    }

    /// Resolve a configured path relative to the root folder
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
