//! The `inventory.toml` settings file. It fixes the template and output paths, the required key
//! set, and where values come from. Every field is optional.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{InventoryError, Result},
    keys::{Key, RequiredKeys},
    provider::{EnvProvider, KeyValueProvider, YamlFileProvider},
};

pub const DEFAULT_SETTINGS_FILE: &str = "inventory.toml";
pub const DEFAULT_TEMPLATE: &str = "inventory.ini.j2";
pub const DEFAULT_OUTPUT: &str = "inventory.ini";
pub const DEFAULT_ENV_FILE: &str = ".env.yml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    template: Option<PathBuf>,
    output: Option<PathBuf>,
    required_keys: Option<Vec<Key>>,
    source: Option<SourceFile>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum SourceFile {
    Env {
        #[serde(default)]
        prefix: String,
    },
    YamlFile {
        path: Option<PathBuf>,
    },
}

/// Where the required keys are resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// The process environment, `prefix` + uppercased key.
    Env { prefix: String },
    /// A YAML mapping of key names to values.
    YamlFile { path: PathBuf },
}

impl Default for Source {
    fn default() -> Self {
        Source::Env {
            prefix: String::new(),
        }
    }
}

impl Source {
    pub fn provider(&self) -> Result<Box<dyn KeyValueProvider>> {
        Ok(match self {
            Source::Env { prefix } => Box::new(EnvProvider::new(prefix.as_str())),
            Source::YamlFile { path } => Box::new(YamlFileProvider::from_file(path)?),
        })
    }
}

/// Effective settings, paths already resolved against the settings file's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub template: PathBuf,
    pub output: PathBuf,
    pub required_keys: RequiredKeys,
    pub source: Source,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.into(),
            output: DEFAULT_OUTPUT.into(),
            required_keys: RequiredKeys::default(),
            source: Source::default(),
        }
    }
}

impl Settings {
    /// Reads the settings file at `path`. The file must exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        let toml = fs::read_to_string(path).map_err(|e| InventoryError::InvalidSettings {
            reason: format!("failed to read {path:?}: {e}"),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_toml(&toml, base).map_err(|e| match e {
            InventoryError::InvalidSettings { reason } => InventoryError::InvalidSettings {
                reason: format!("{path:?}: {reason}"),
            },
            other => other,
        })
    }

    /// Like [`Settings::from_file`], but falls back to the defaults if there is no file at `path`.
    pub fn from_file_or_default(path: &Path) -> Result<Self> {
        match fs::metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(?path, "No settings file, using defaults");
                Ok(Self::default())
            }
            _ => Self::from_file(path),
        }
    }

    /// Parses settings, resolving relative paths against `base`.
    pub fn from_toml(toml: &str, base: &Path) -> Result<Self> {
        let file: SettingsFile =
            toml::from_str(toml).map_err(|e| InventoryError::InvalidSettings {
                reason: e.to_string(),
            })?;

        let required_keys = match file.required_keys {
            Some(keys) => RequiredKeys::new(keys)?,
            None => RequiredKeys::default(),
        };

        let source = match file.source {
            None => Source::default(),
            Some(SourceFile::Env { prefix }) => Source::Env { prefix },
            Some(SourceFile::YamlFile { path }) => Source::YamlFile {
                path: base.join(path.unwrap_or_else(|| DEFAULT_ENV_FILE.into())),
            },
        };

        Ok(Self {
            template: base.join(file.template.unwrap_or_else(|| DEFAULT_TEMPLATE.into())),
            output: base.join(file.output.unwrap_or_else(|| DEFAULT_OUTPUT.into())),
            required_keys,
            source,
        })
    }
}
