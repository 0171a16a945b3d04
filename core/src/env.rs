//! Process environment capability: environment variables and home directory.

use std::collections::HashMap;
use std::path::PathBuf;

/// Read-only view of the invoking process's environment.
pub trait Environment {
    /// Returns the value of variable `name`, if set and valid UTF-8.
    fn var(&self, name: &str) -> Option<String>;

    /// Returns the invoking user's home directory.
    fn home_dir(&self) -> Option<PathBuf>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}

/// A fixed environment for tests.
///
/// # Examples
///
/// ```
/// use twitter_core::{Environment, MapEnv};
///
/// let env = MapEnv::new().with_var("DBPATH", "/tmp/t.db").with_home("/home/u");
/// assert_eq!(env.var("DBPATH").as_deref(), Some("/tmp/t.db"));
/// assert!(env.var("HOME").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
    home: Option<PathBuf>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }
}

impl Environment for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }
}
