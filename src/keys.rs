//! The fixed set of configuration keys an inventory needs.
//!
//! Keys are lowercase identifiers, the same names the template uses inside `{{ }}`. In the process
//! environment the key is looked up uppercased, so `server_ip` is read from `SERVER_IP`.

use std::fmt;

use serde::Deserialize;

use crate::error::{InventoryError, Result};

/// Keys required when no settings file overrides them.
pub const DEFAULT_REQUIRED_KEYS: [&str; 2] = ["server_ip", "ansible_user"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Key(String);

impl Key {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(InventoryError::InvalidSettings {
                reason: format!(
                    "`{name}` is not a valid key name (expected lowercase letters, digits and `_`)"
                ),
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The environment variable this key is read from.
    pub fn env_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0.to_ascii_uppercase())
    }
}

impl TryFrom<String> for Key {
    type Error = InventoryError;

    fn try_from(name: String) -> Result<Self> {
        Key::new(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// The declared set of required keys, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredKeys {
    keys: Vec<Key>,
}

impl RequiredKeys {
    pub fn new(keys: Vec<Key>) -> Result<Self> {
        if keys.is_empty() {
            return Err(InventoryError::InvalidSettings {
                reason: "at least one required key must be declared".into(),
            });
        }

        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(InventoryError::InvalidSettings {
                    reason: format!("required key `{key}` is declared twice"),
                });
            }
        }

        Ok(Self { keys })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keys.iter().any(|key| key.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for RequiredKeys {
    fn default() -> Self {
        Self {
            keys: DEFAULT_REQUIRED_KEYS
                .iter()
                .map(|name| Key(name.to_string()))
                .collect(),
        }
    }
}
