//! Layered configuration resolution.
//!
//! [`Settings`] is built once at startup. Flags are bound into it while the
//! command tree is assembled; after argument parsing it reads the config file
//! once and records the values the user supplied on the command line. Every
//! lookup then consults, in order:
//!
//! 1. a bound flag explicitly given on the command line,
//! 2. the loaded config file,
//! 3. the environment variable named after the key,
//! 4. the default registered with the flag.
//!
//! Keys are case-insensitive. Nested mappings in the config file are
//! addressed with dotted keys (`storage.path`).
//!
//! # Config file discovery
//!
//! An explicit path (`--config`) is used as-is, with no search. Otherwise the
//! resolver looks for [`CONFIG_FILE_STEM`] with any of the
//! [`SUPPORTED_EXTENSIONS`] under `<home>/`[`CONFIG_DIR_NAME`]. A missing
//! file is not an error and nothing is printed; a loaded file is announced
//! on the diagnostic stream.
//!
//! # Examples
//!
//! ```
//! use std::path::Path;
//! use twitter_core::{ConfigSource, FlagDescriptor, MapEnv, MemoryFs, Settings};
//!
//! let fs = MemoryFs::new().with_file("/home/u/.config/.twitter.yaml", "DBPath: /data/t.db\n");
//! let mut settings = Settings::new(Box::new(MapEnv::new().with_home("/home/u")));
//! settings
//!     .bind(&FlagDescriptor::new("db-path", "DB file path").bind_to("DBPath"))
//!     .unwrap();
//!
//! let mut diag = Vec::new();
//! settings.read_in_config(None, &fs, &mut diag).unwrap();
//!
//! assert_eq!(settings.get("DBPath").as_deref(), Some("/data/t.db"));
//! assert_eq!(
//!     settings.source(),
//!     &ConfigSource::Discovered(Path::new("/home/u/.config/.twitter.yaml").to_path_buf())
//! );
//! assert_eq!(
//!     String::from_utf8(diag).unwrap(),
//!     "Using config file: /home/u/.config/.twitter.yaml\n"
//! );
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::env::Environment;
use crate::error::{ConfigError, FlagError, Result};
use crate::flag::{FlagDescriptor, is_reserved_name, is_valid_key};
use crate::fs::FileSystem;

/// Directory under the home directory searched for the config file.
pub const CONFIG_DIR_NAME: &str = ".config";
/// Base name of the config file, without extension.
pub const CONFIG_FILE_STEM: &str = ".twitter";
/// Extensions tried, in order, when searching for the config file.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];
/// Config key the `--db-path` flag is bound under.
pub const DB_PATH_KEY: &str = "DBPath";

/// Where the configuration for this run comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// A file named with `--config`.
    Explicit(PathBuf),
    /// A file found in the home directory.
    Discovered(PathBuf),
    /// No file; environment and defaults only.
    #[default]
    EnvironmentOnly,
}

impl ConfigSource {
    /// Path of the file in use, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(path) | Self::Discovered(path) => Some(path),
            Self::EnvironmentOnly => None,
        }
    }
}

/// The layer a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueOrigin {
    Flag,
    File,
    Env,
    Default,
}

impl fmt::Display for ValueOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Flag => "flag",
            Self::File => "file",
            Self::Env => "env",
            Self::Default => "default",
        };
        f.write_str(name)
    }
}

/// Resolved configuration for one process run.
pub struct Settings {
    env: Box<dyn Environment>,
    source: ConfigSource,
    /// Bound key (lowercased) to the key as registered.
    keys: BTreeMap<String, String>,
    /// Flag name to lowercased key.
    bindings: BTreeMap<String, String>,
    defaults: BTreeMap<String, String>,
    file: BTreeMap<String, Value>,
    flags: BTreeMap<String, String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("source", &self.source)
            .field("bindings", &self.bindings)
            .field("defaults", &self.defaults)
            .field("file", &self.file)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn new(env: Box<dyn Environment>) -> Self {
        Self {
            env,
            source: ConfigSource::EnvironmentOnly,
            keys: BTreeMap::new(),
            bindings: BTreeMap::new(),
            defaults: BTreeMap::new(),
            file: BTreeMap::new(),
            flags: BTreeMap::new(),
        }
    }

    /// Binds a flag under its configuration key.
    ///
    /// Binding the same flag name twice is allowed as long as it resolves to
    /// the same key; sibling commands commonly share local flags such as
    /// `--format`.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::ReservedName`] for `help` or `version`, and
    /// [`FlagError::InvalidKey`] if the key is malformed or the flag name is
    /// already bound to a different key.
    pub fn bind(&mut self, flag: &FlagDescriptor) -> std::result::Result<(), FlagError> {
        if is_reserved_name(&flag.name) {
            return Err(FlagError::ReservedName(flag.name.clone()));
        }
        let key = flag.key();
        let normalized = normalize(key);
        let rejected = || FlagError::InvalidKey {
            flag: flag.name.clone(),
            key: key.to_string(),
        };

        if !is_valid_key(key) {
            return Err(rejected());
        }
        if let Some(existing) = self.bindings.get(&flag.name) {
            if *existing != normalized {
                return Err(rejected());
            }
        }

        self.bindings.insert(flag.name.clone(), normalized.clone());
        self.keys
            .entry(normalized.clone())
            .or_insert_with(|| key.to_string());
        if let Some(default) = &flag.default {
            self.defaults.insert(normalized, default.clone());
        }
        Ok(())
    }

    /// Key a flag is bound under, as registered.
    pub fn bound_key(&self, flag_name: &str) -> Option<&str> {
        self.bindings
            .get(flag_name)
            .and_then(|normalized| self.keys.get(normalized))
            .map(String::as_str)
    }

    /// Records a value the user supplied for a bound flag.
    ///
    /// Returns `false` and ignores the value if the flag is not bound.
    pub fn set_flag(&mut self, flag_name: &str, value: &str) -> bool {
        match self.bindings.get(flag_name) {
            Some(key) => {
                self.flags.insert(key.clone(), value.to_string());
                true
            }
            None => false,
        }
    }

    /// Forgets every value recorded with [`set_flag`](Self::set_flag).
    pub fn clear_flags(&mut self) {
        self.flags.clear();
    }

    /// Selects and reads the config file.
    ///
    /// With a non-empty `explicit` path, exactly that file is used. Otherwise
    /// the home directory is searched. A file that is missing or fails to
    /// parse leaves the file layer empty; only a successful load writes
    /// `Using config file: <path>` to `diag`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HomeDirNotFound`] when no explicit path is
    /// given and the home directory cannot be determined, and
    /// [`ConfigError::Io`] if the notice cannot be written to `diag`.
    pub fn read_in_config(
        &mut self,
        explicit: Option<&str>,
        fs: &dyn FileSystem,
        diag: &mut dyn Write,
    ) -> Result<()> {
        let candidate = match explicit.filter(|path| !path.is_empty()) {
            Some(path) => ConfigSource::Explicit(PathBuf::from(path)),
            None => {
                let home = self.env.home_dir().ok_or(ConfigError::HomeDirNotFound)?;
                match find_config_file(&home.join(CONFIG_DIR_NAME), fs) {
                    Some(path) => ConfigSource::Discovered(path),
                    None => {
                        debug!(home = %home.display(), "no config file found");
                        ConfigSource::EnvironmentOnly
                    }
                }
            }
        };

        let Some(path) = candidate.path() else {
            self.source = ConfigSource::EnvironmentOnly;
            return Ok(());
        };

        match load_file(path, fs) {
            Ok(values) => {
                self.file = values;
                self.source = candidate.clone();
                writeln!(diag, "Using config file: {}", path.display())?;
            }
            Err(err @ ConfigError::Read { .. }) => {
                debug!(%err, "config file not loaded");
                self.source = ConfigSource::EnvironmentOnly;
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring unreadable config file");
                self.source = ConfigSource::EnvironmentOnly;
            }
        }
        Ok(())
    }

    /// The configuration source selected by [`read_in_config`](Self::read_in_config).
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Path of the config file in use, if one was loaded.
    pub fn config_file_used(&self) -> Option<&Path> {
        self.source.path()
    }

    /// Where a config file is looked for when none is named explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HomeDirNotFound`] if the home directory cannot
    /// be determined.
    pub fn default_config_path(&self) -> Result<PathBuf> {
        let home = self.env.home_dir().ok_or(ConfigError::HomeDirNotFound)?;
        Ok(home
            .join(CONFIG_DIR_NAME)
            .join(format!("{CONFIG_FILE_STEM}.{}", SUPPORTED_EXTENSIONS[0])))
    }

    /// Keys bound to flags, as registered.
    pub fn bound_keys(&self) -> Vec<&str> {
        self.keys.values().map(String::as_str).collect()
    }

    /// Resolves `key` to a string value.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).map(|(value, _)| value)
    }

    /// Resolves `key` and reports which layer supplied the value.
    pub fn lookup(&self, key: &str) -> Option<(String, ValueOrigin)> {
        let normalized = normalize(key);

        if let Some(value) = self.flags.get(&normalized) {
            return Some((value.clone(), ValueOrigin::Flag));
        }
        if let Some(value) = self.file.get(&normalized) {
            return Some((render(value), ValueOrigin::File));
        }
        if let Some(value) = self.env_value(key, &normalized) {
            return Some((value, ValueOrigin::Env));
        }
        self.defaults
            .get(&normalized)
            .map(|value| (value.clone(), ValueOrigin::Default))
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Database file path, bound to the `--db-path` flag.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.get(DB_PATH_KEY)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    }

    /// Every bound or file-provided key, as registered where known.
    pub fn keys(&self) -> Vec<String> {
        let mut normalized: BTreeSet<&String> = self.keys.keys().collect();
        normalized.extend(self.file.keys());
        normalized
            .into_iter()
            .map(|key| self.keys.get(key).unwrap_or(key).clone())
            .collect()
    }

    /// Resolves every key in [`keys`](Self::keys) that has a value.
    pub fn all(&self) -> BTreeMap<String, String> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.get(&key).map(|value| (key, value)))
            .collect()
    }

    fn env_value(&self, key: &str, normalized: &str) -> Option<String> {
        let mut names = vec![key.to_string()];
        if let Some(registered) = self.keys.get(normalized) {
            names.push(registered.clone());
        }
        names.push(key.to_ascii_uppercase());
        names.dedup();
        names.iter().find_map(|name| self.env.var(name))
    }
}

fn normalize(key: &str) -> String {
    key.to_ascii_lowercase()
}

/// Looks for `CONFIG_FILE_STEM.<ext>` in `dir`, trying extensions in order.
pub fn find_config_file(dir: &Path, fs: &dyn FileSystem) -> Option<PathBuf> {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{CONFIG_FILE_STEM}.{ext}")))
        .find(|path| fs.exists(path))
}

/// Reads and flattens a config file into lowercased dotted keys.
fn load_file(path: &Path, fs: &dyn FileSystem) -> Result<BTreeMap<String, Value>> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
    }

    let raw = fs.read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let root: Value = if ext == "json" {
        serde_json::from_str(&raw)?
    } else {
        serde_yaml::from_str(&raw)?
    };

    let mut values = BTreeMap::new();
    match root {
        Value::Null => {}
        Value::Mapping(_) => flatten("", root, &mut values)?,
        _ => {
            return Err(ConfigError::InvalidKey(
                "config file root must be a mapping".to_string(),
            ));
        }
    }
    Ok(values)
}

fn flatten(prefix: &str, value: Value, out: &mut BTreeMap<String, Value>) -> Result<()> {
    let Value::Mapping(mapping) = value else {
        if out.insert(prefix.to_string(), value).is_some() {
            warn!(key = prefix, "config key given more than once; last value wins");
        }
        return Ok(());
    };

    for (key, value) in mapping {
        let key = match key {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => return Err(ConfigError::InvalidKey(render(&other))),
        };
        let key = normalize(&key);
        let full = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        flatten(&full, value, out)?;
    }
    Ok(())
}

/// Renders a leaf value the way it would be typed on the command line.
fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => render(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}
