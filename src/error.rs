use std::{io, path::PathBuf};

use thiserror::Error;

use crate::keys::Key;

pub type Result<T, E = InventoryError> = std::result::Result<T, E>;

/// Everything that can stop an inventory from being generated.
///
/// None of these are transient, so none are retried.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// One or more required keys are unset or blank. Lists all of them.
    #[error("missing required configuration: {}", display_keys(.keys))]
    MissingConfiguration { keys: Vec<Key> },

    #[error("template not found at {path:?}")]
    TemplateNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The template references a key that is not in the required set.
    #[error("template references undeclared placeholder `{name}`")]
    UndefinedPlaceholder { name: String },

    #[error("template could not be rendered: {reason}")]
    TemplateSyntax { reason: String },

    #[error("failed to write inventory to {path:?}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration source {path:?} is unusable: {reason}")]
    ConfigurationSource { path: PathBuf, reason: String },

    #[error("invalid settings: {reason}")]
    InvalidSettings { reason: String },
}

fn display_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(Key::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
