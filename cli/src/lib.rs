//! Command tree and executor for the `twitter` tool.
//!
//! The binary is a thin wrapper around [`execute`]: it builds the tree with
//! [`new_root_cmd`] against the real filesystem and environment, runs the
//! command line, and turns errors into an exit status.
//!
//! Subcommands are registered statically in [`SUBCOMMANDS`]. Each
//! constructor receives the [`FileSystem`](twitter_core::FileSystem)
//! capability, so the whole tree can be exercised against
//! [`MemoryFs`](twitter_core::MemoryFs):
//!
//! ```
//! use std::sync::Arc;
//! use twitter_cli::new_root_cmd;
//! use twitter_core::{MapEnv, MemoryFs};
//!
//! let mut root = new_root_cmd(
//!     Arc::new(MemoryFs::new()),
//!     Box::new(MapEnv::new().with_home("/home/u")),
//! )
//! .unwrap();
//!
//! let mut out = Vec::new();
//! root.execute(
//!     ["twitter", "--db-path", "/tmp/x.db", "config", "get", "DBPath"],
//!     &mut out,
//!     &mut std::io::sink(),
//! )
//! .unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "/tmp/x.db\n");
//! ```

pub mod command;
pub mod commands;
mod error;
pub mod root;

use std::io::{self, Write};

use twitter_core::{OsFs, ProcessEnv};

pub use command::{CommandNode, Context, Handler};
pub use error::{CliError, Result};
pub use root::{
    APP_NAME, APP_VERSION, RootCommand, SUBCOMMANDS, SubcommandConstructor, new_root_cmd,
    new_root_cmd_with, register_string_flag,
};

/// Builds the command tree, runs the process's command line, and exits.
///
/// A tree that fails to build is a programming error and panics. A command
/// that fails prints its error to standard output and exits with status 1.
pub fn execute() {
    let mut root = match new_root_cmd(OsFs::shared(), Box::new(ProcessEnv)) {
        Ok(root) => root,
        Err(err) => panic!("failed to build command tree: {err}"),
    };

    let mut out = io::stdout().lock();
    let mut diag = io::stderr();
    if let Err(err) = root.execute(std::env::args_os(), &mut out, &mut diag) {
        let message = err.to_string();
        let _ = write!(out, "{message}");
        if !message.ends_with('\n') {
            let _ = writeln!(out);
        }
        let _ = out.flush();
        std::process::exit(1);
    }
}
