//! Flag descriptors and per-command flag sets.
//!
//! Every flag the CLI exposes is string-valued and bound to a configuration
//! key, so a value supplied on the command line overrides the same key from
//! the config file or environment. A [`FlagSet`] owns the flags declared on
//! one command and enforces that their names are unique and well-formed.
//!
//! # Examples
//!
//! ```
//! use twitter_core::{FlagDescriptor, FlagSet};
//!
//! let mut flags = FlagSet::new("twitter");
//! flags
//!     .register(FlagDescriptor::new("db-path", "DB file path").persistent().bind_to("DBPath"))
//!     .unwrap();
//! assert_eq!(flags.get("db-path").unwrap().key(), "DBPath");
//! assert!(flags.register(FlagDescriptor::new("db-path", "again")).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::FlagError;

/// Names the argument parser claims for `--help` and `--version`.
pub const RESERVED_FLAG_NAMES: [&str; 2] = ["help", "version"];

/// A string-valued flag and its binding metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagDescriptor {
    /// Long name without leading dashes (e.g. `db-path`).
    pub name: String,
    /// Inherited by every descendant command when `true`.
    pub persistent: bool,
    /// Config key override; the flag name is used when absent.
    pub config_key: Option<String>,
    /// Help text.
    pub usage: String,
    /// Value used for the bound key when no other source provides one.
    pub default: Option<String>,
}

impl FlagDescriptor {
    /// Creates a local flag bound under its own name.
    pub fn new(name: &str, usage: &str) -> Self {
        Self {
            name: name.to_string(),
            persistent: false,
            config_key: None,
            usage: usage.to_string(),
            default: None,
        }
    }

    /// Marks the flag as inherited by all descendant commands.
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Binds the flag under `key` instead of its name.
    pub fn bind_to(mut self, key: &str) -> Self {
        self.config_key = Some(key.to_string());
        self
    }

    /// Sets the lowest-precedence value for the bound key.
    pub fn with_default(mut self, value: &str) -> Self {
        self.default = Some(value.to_string());
        self
    }

    /// Returns the configuration key this flag is bound under.
    pub fn key(&self) -> &str {
        self.config_key.as_deref().unwrap_or(&self.name)
    }

    fn validate(&self) -> Result<(), FlagError> {
        if !is_valid_flag_name(&self.name) {
            return Err(FlagError::InvalidName(self.name.clone()));
        }
        if is_reserved_name(&self.name) {
            return Err(FlagError::ReservedName(self.name.clone()));
        }
        if !is_valid_key(self.key()) {
            return Err(FlagError::InvalidKey {
                flag: self.name.clone(),
                key: self.key().to_string(),
            });
        }
        Ok(())
    }
}

/// Returns `true` for lowercase kebab-case names such as `db-path`.
fn is_valid_flag_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Returns `true` for ids the argument parser generates on its own.
pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_FLAG_NAMES.contains(&name)
}

/// Returns `true` if `key` can be used as a configuration key.
///
/// Keys are non-empty, contain no whitespace, and do not start or end with
/// the `.` nesting separator.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.chars().any(char::is_whitespace)
        && !key.starts_with('.')
        && !key.ends_with('.')
        && !key.contains("..")
}

/// The flags declared directly on one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    command: String,
    flags: Vec<FlagDescriptor>,
}

impl FlagSet {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            flags: Vec::new(),
        }
    }

    /// Name of the command owning this set.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Registers a flag.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::InvalidName`] or [`FlagError::InvalidKey`] for a
    /// malformed descriptor, and [`FlagError::DuplicateFlag`] if the name is
    /// already taken on this command. The set is unchanged on error.
    pub fn register(&mut self, flag: FlagDescriptor) -> Result<(), FlagError> {
        flag.validate()?;
        if self.contains(&flag.name) {
            return Err(FlagError::DuplicateFlag {
                command: self.command.clone(),
                flag: flag.name,
            });
        }
        self.flags.push(flag);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&FlagDescriptor> {
        self.flags.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagDescriptor> {
        self.flags.iter()
    }

    /// Flags inherited by descendant commands.
    pub fn persistent(&self) -> impl Iterator<Item = &FlagDescriptor> {
        self.flags.iter().filter(|f| f.persistent)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
