//! Subcommands attached to the root command.
//!
//! Each module exposes one constructor matching
//! [`SubcommandConstructor`](crate::root::SubcommandConstructor).

pub mod config;
