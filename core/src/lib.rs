//! Configuration bootstrap shared by the `twitter` command-line tool.
//!
//! This crate holds everything the command tree needs before any command
//! runs:
//!
//! - [`FlagDescriptor`] / [`FlagSet`] — string-valued flags with a config key
//!   binding, unique per command.
//! - [`Settings`] — the layered configuration resolver (command-line flag,
//!   config file, environment, default).
//! - [`FileSystem`] — file I/O capability, real ([`OsFs`]) or in-memory
//!   ([`MemoryFs`]).
//! - [`Environment`] — environment variables and home directory, real
//!   ([`ProcessEnv`]) or fixed ([`MapEnv`]).
//!
//! # Example
//!
//! ```
//! use twitter_core::*;
//!
//! let mut flags = FlagSet::new("twitter");
//! let mut settings = Settings::new(Box::new(MapEnv::new().with_home("/home/u")));
//!
//! let db_path = FlagDescriptor::new("db-path", "DB file path")
//!     .persistent()
//!     .bind_to(DB_PATH_KEY);
//! settings.bind(&db_path).unwrap();
//! flags.register(db_path).unwrap();
//!
//! settings.read_in_config(None, &MemoryFs::new(), &mut std::io::sink()).unwrap();
//! settings.set_flag("db-path", "/tmp/x.db");
//! assert_eq!(settings.db_path(), Some("/tmp/x.db".into()));
//! ```

mod env;
mod error;
mod flag;
mod fs;
mod settings;

pub use env::{Environment, MapEnv, ProcessEnv};
pub use error::{ConfigError, FlagError, Result};
pub use flag::{FlagDescriptor, FlagSet, RESERVED_FLAG_NAMES, is_reserved_name, is_valid_key};
pub use fs::{FileSystem, MemoryFs, OsFs};
pub use settings::{
    CONFIG_DIR_NAME, CONFIG_FILE_STEM, ConfigSource, DB_PATH_KEY, SUPPORTED_EXTENSIONS, Settings,
    ValueOrigin, find_config_file,
};
