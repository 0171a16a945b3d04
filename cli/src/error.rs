//! Error type for building and running the command tree.

use thiserror::Error;
use twitter_core::{ConfigError, FlagError};

/// Errors surfaced while building the command tree or dispatching a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Flag registration or binding failed while building the tree.
    #[error(transparent)]
    Flag(#[from] FlagError),

    /// Two commands with the same name were attached to one parent.
    #[error("duplicate subcommand on '{parent}': {name}")]
    DuplicateCommand { parent: String, name: String },

    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The command line did not parse (unknown subcommand, bad flag, ...).
    #[error("{0}")]
    Usage(clap::Error),

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A subcommand reported a failure.
    #[error("{0}")]
    Command(String),
}

/// Convenience alias for results with [`CliError`].
pub type Result<T> = std::result::Result<T, CliError>;
