//! Error types for flag registration and configuration resolution.
//!
//! Registration failures ([`FlagError`]) are programming errors: they abort
//! command-tree construction. Resolution failures ([`ConfigError`]) surface
//! at startup, before any command runs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while registering a flag on a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    /// Flag name is empty or not lowercase kebab-case.
    #[error("invalid flag name: {0:?}")]
    InvalidName(String),

    /// The resolver rejected the key a flag asked to be bound under.
    #[error("flag --{flag} cannot be bound to config key {key:?}")]
    InvalidKey { flag: String, key: String },

    /// Two flags on the same command share a name.
    #[error("duplicate flag on command '{command}': --{flag}")]
    DuplicateFlag { command: String, flag: String },

    /// A local flag reuses the name of a persistent flag inherited from an
    /// ancestor command.
    #[error("flag --{flag} on '{command}' shadows an inherited persistent flag")]
    ShadowedFlag { command: String, flag: String },

    /// The name is taken by an argument the parser generates itself.
    #[error("flag name --{0} is reserved")]
    ReservedName(String),

    /// A positional argument shares its id with a flag in scope.
    #[error("argument <{arg}> on '{command}' collides with flag --{arg}")]
    ArgumentConflict { command: String, arg: String },
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The invoking user's home directory could not be determined.
    #[error("home directory not found")]
    HomeDirNotFound,

    /// Config file could not be read.
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The diagnostic stream could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file extension is not one the resolver can parse.
    #[error("unsupported config file type: {0:?}")]
    UnsupportedFormat(String),

    /// Config file root is not a mapping, or a key is malformed.
    #[error("invalid config key: {0}")]
    InvalidKey(String),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_error_display() {
        let error = FlagError::DuplicateFlag {
            command: "twitter".to_string(),
            flag: "db-path".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "duplicate flag on command 'twitter': --db-path"
        );

        let error = FlagError::InvalidKey {
            flag: "db-path".to_string(),
            key: String::new(),
        };
        assert_eq!(
            error.to_string(),
            "flag --db-path cannot be bound to config key \"\""
        );

        assert_eq!(
            FlagError::ReservedName("help".to_string()).to_string(),
            "flag name --help is reserved"
        );
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::HomeDirNotFound.to_string(),
            "home directory not found"
        );

        let error = ConfigError::Read {
            path: PathBuf::from("/tmp/missing.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(
            error.to_string(),
            "failed to read config file '/tmp/missing.yaml': gone"
        );
    }
}
