//! Sources the required keys are resolved from.

use std::{collections::BTreeMap, env, fs, path::Path};

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::{
    error::{InventoryError, Result},
    keys::Key,
};

/// A key/value source. `None` means the key is not set.
pub trait KeyValueProvider {
    fn resolve(&self, key: &Key) -> Option<String>;
}

/// Reads keys from the process environment, uppercased and prefixed.
#[derive(Debug, Default, Clone)]
pub struct EnvProvider {
    prefix: String,
}

impl EnvProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl KeyValueProvider for EnvProvider {
    fn resolve(&self, key: &Key) -> Option<String> {
        let name = key.env_name(&self.prefix);
        match env::var(&name) {
            Ok(value) => Some(value),
            Err(env::VarError::NotPresent) => None,
            Err(env::VarError::NotUnicode(_)) => {
                warn!(variable = %name, "Ignoring environment variable that is not valid unicode");
                None
            }
        }
    }
}

/// Keys loaded once from a YAML mapping, `.env.yml` by default.
///
/// Scalars are converted to strings. `null`, sequences and mappings count as unset.
#[derive(Debug, Default, Clone)]
pub struct YamlFileProvider {
    values: BTreeMap<String, String>,
}

impl YamlFileProvider {
    pub fn from_file(path: &Path) -> Result<Self> {
        let source_error = |reason: String| InventoryError::ConfigurationSource {
            path: path.to_owned(),
            reason,
        };

        let yaml = fs::read_to_string(path).map_err(|e| source_error(e.to_string()))?;
        let provider = Self::parse(&yaml).map_err(source_error)?;
        debug!(?path, entries = provider.values.len(), "Loaded key/value file");
        Ok(provider)
    }

    fn parse(yaml: &str) -> Result<Self, String> {
        let document: Value = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
        let mapping = match document {
            Value::Mapping(mapping) => mapping,
            // An empty file.
            Value::Null => Default::default(),
            _ => return Err("expected a mapping of keys to values".into()),
        };

        let mut values = BTreeMap::new();
        for (key, value) in mapping {
            let key = match key {
                Value::String(key) => key,
                other => return Err(format!("mapping key {other:?} is not a string")),
            };
            if let Some(value) = scalar_to_string(value) {
                values.insert(key, value);
            }
        }

        Ok(Self { values })
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

impl KeyValueProvider for YamlFileProvider {
    fn resolve(&self, key: &Key) -> Option<String> {
        self.values.get(key.as_str()).cloned()
    }
}

/// An in-memory provider.
#[derive(Debug, Default, Clone)]
pub struct MapProvider {
    values: BTreeMap<String, String>,
}

impl MapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapProvider {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl KeyValueProvider for MapProvider {
    fn resolve(&self, key: &Key) -> Option<String> {
        self.values.get(key.as_str()).cloned()
    }
}

impl<P: KeyValueProvider + ?Sized> KeyValueProvider for &P {
    fn resolve(&self, key: &Key) -> Option<String> {
        (**self).resolve(key)
    }
}

impl<P: KeyValueProvider + ?Sized> KeyValueProvider for Box<P> {
    fn resolve(&self, key: &Key) -> Option<String> {
        (**self).resolve(key)
    }
}
