//! Error types for lpbuild-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading and registering project config.
///
/// Every variant is fatal for the run: nothing has touched the remote system
/// yet when one of these is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, including file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The `--config-dir` directory does not exist.
    #[error("configuration directory \"{path}\" does not exist")]
    ConfigDirNotFound { path: PathBuf },

    /// A group requested by name has no `<group>.yaml` file.
    #[error("the group config file '{path}' wasn't found")]
    GroupNotFound { path: PathBuf },

    /// A project entry has no `name` key.
    #[error("project entry #{index} in {origin} has no 'name'")]
    MissingName { origin: String, index: usize },

    /// A first declaration of a project lacks a required key.
    #[error("project '{project}' is missing required key '{key}'")]
    MissingKey { project: String, key: &'static str },

    /// A `branches` entry is not a mapping.
    #[error("project '{project}': expected a mapping for branch '{branch}'")]
    BranchNotMapping { project: String, branch: String },

    /// A `recipe-name` template uses an unknown or unterminated placeholder.
    #[error("project '{project}', branch '{branch}': invalid recipe-name template '{template}': {reason}")]
    InvalidTemplate {
        project: String,
        branch: String,
        template: String,
        reason: String,
    },

    /// Two branch/track pairs of a project format to the same recipe name.
    #[error("project '{project}': recipe name '{recipe}' is produced by both '{first}' and '{second}'")]
    RecipeNameCollision {
        project: String,
        recipe: String,
        first: String,
        second: String,
    },

    /// The same project is declared twice without an explicit merge.
    #[error("project config for '{name}' already exists")]
    DuplicateProject { name: String },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
