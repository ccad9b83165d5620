use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    error::{InventoryError, Result},
    keys::{Key, RequiredKeys},
    provider::KeyValueProvider,
};

/// Values bound to every required key. Contains nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<Key, String>,
}

impl Bindings {
    /// Resolves all required keys. Blank values count as missing, others are bound as supplied.
    ///
    /// Fails with every missing key, in declaration order, not just the first.
    pub fn resolve(keys: &RequiredKeys, provider: &impl KeyValueProvider) -> Result<Self> {
        let mut values = BTreeMap::new();
        let mut missing = Vec::new();

        for key in keys.iter() {
            match provider.resolve(key) {
                Some(value) if !value.trim().is_empty() => {
                    values.insert(key.clone(), value);
                }
                _ => missing.push(key.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(InventoryError::MissingConfiguration { keys: missing });
        }

        debug!(keys = values.len(), "Resolved required keys");
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_context(&self) -> tera::Context {
        let mut context = tera::Context::new();
        for (key, value) in &self.values {
            context.insert(key.as_str(), value);
        }
        context
    }
}
