//! Root command assembly and dispatch.
//!
//! [`new_root_cmd`] registers the global flags, runs every statically
//! registered subcommand constructor, and returns the finished tree. Nothing
//! is returned if any step fails. [`RootCommand::execute`] parses a command
//! line, resolves configuration once, and runs the selected command.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use clap::error::ErrorKind;
use tracing::debug;
use twitter_core::{
    DB_PATH_KEY, Environment, FileSystem, FlagDescriptor, FlagError, Settings,
};

use crate::command::CommandNode;
use crate::commands;
use crate::error::{CliError, Result};

/// Name of the root command.
pub const APP_NAME: &str = "twitter";
/// Version reported by `--version`.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the persistent flag selecting the config file.
pub const CONFIG_FLAG: &str = "config";
/// Name of the persistent flag selecting the database file.
pub const DB_PATH_FLAG: &str = "db-path";

/// Builds one subcommand, given the filesystem it should use.
pub type SubcommandConstructor = fn(Arc<dyn FileSystem>) -> Result<CommandNode>;

/// Every subcommand attached to the root, in display order.
pub const SUBCOMMANDS: &[SubcommandConstructor] = &[commands::config::new_config_cmd];

fn config_flag() -> FlagDescriptor {
    FlagDescriptor::new(
        CONFIG_FLAG,
        "config file (default is $HOME/.config/.twitter.yaml)",
    )
    .persistent()
}

fn db_path_flag() -> FlagDescriptor {
    FlagDescriptor::new(DB_PATH_FLAG, "DB file path")
        .persistent()
        .bind_to(DB_PATH_KEY)
}

/// Registers a string flag on `node` and binds it into `settings`.
///
/// # Errors
///
/// Returns the registration or binding error unchanged; callers must abandon
/// the tree being built.
pub fn register_string_flag(
    node: &mut CommandNode,
    settings: &mut Settings,
    flag: FlagDescriptor,
) -> std::result::Result<(), FlagError> {
    node.register_flag(flag.clone())?;
    settings.bind(&flag)
}

/// The assembled command tree and the configuration it resolves into.
pub struct RootCommand {
    node: CommandNode,
    settings: Settings,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for RootCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootCommand")
            .field("node", &self.node)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builds the root command with the statically registered subcommands.
pub fn new_root_cmd(fs: Arc<dyn FileSystem>, env: Box<dyn Environment>) -> Result<RootCommand> {
    new_root_cmd_with(fs, env, SUBCOMMANDS)
}

/// Builds the root command from an explicit constructor table.
///
/// # Errors
///
/// Any flag registration, constructor, or binding error aborts the build.
pub fn new_root_cmd_with(
    fs: Arc<dyn FileSystem>,
    env: Box<dyn Environment>,
    constructors: &[SubcommandConstructor],
) -> Result<RootCommand> {
    let mut settings = Settings::new(env);
    let mut node = CommandNode::new(APP_NAME, "CLI for collect tweets");

    register_string_flag(&mut node, &mut settings, config_flag())?;
    register_string_flag(&mut node, &mut settings, db_path_flag())?;

    let mut sub_cmds = Vec::with_capacity(constructors.len());
    for construct in constructors {
        sub_cmds.push(construct(Arc::clone(&fs))?);
    }
    for sub_cmd in sub_cmds {
        node.add_child(sub_cmd)?;
    }
    node.bind_all(&mut settings, &BTreeSet::new())?;

    debug!(subcommands = node.children().len(), "command tree built");
    Ok(RootCommand { node, settings, fs })
}

impl RootCommand {
    pub fn node(&self) -> &CommandNode {
        &self.node
    }

    /// Configuration as resolved by the last [`execute`](Self::execute).
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The clap command for the whole tree.
    pub fn command(&self) -> clap::Command {
        self.node.to_clap().version(APP_VERSION)
    }

    /// Parses `args`, resolves configuration, and runs the selected command.
    ///
    /// Command output goes to `out`; the `Using config file` notice goes to
    /// `diag`. `--help` and `--version` print to `out` and succeed.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Usage`] for a command line that does not parse,
    /// [`CliError::Config`] if the home directory cannot be determined, and
    /// whatever the dispatched handler returns.
    pub fn execute<I, T>(&mut self, args: I, out: &mut dyn Write, diag: &mut dyn Write) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match self.command().try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    write!(out, "{}", err.render())?;
                    return Ok(());
                }
                _ => return Err(CliError::Usage(err)),
            },
        };

        self.settings.clear_flags();
        self.node.apply_flags(&matches, &mut self.settings);
        let explicit = matches.get_one::<String>(CONFIG_FLAG).cloned();
        self.settings
            .read_in_config(explicit.as_deref(), self.fs.as_ref(), diag)?;

        self.node
            .dispatch(&matches, &self.settings, out, &mut Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use twitter_core::{ConfigSource, MapEnv, MemoryFs};

    use super::*;

    const HOME: &str = "/home/tester";

    fn build(fs: MemoryFs) -> RootCommand {
        new_root_cmd(Arc::new(fs), Box::new(MapEnv::new().with_home(HOME))).unwrap()
    }

    fn run(root: &mut RootCommand, args: &[&str]) -> (Result<()>, String, String) {
        let mut out = Vec::new();
        let mut diag = Vec::new();
        let result = root.execute(args.iter().copied(), &mut out, &mut diag);
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(diag).unwrap(),
        )
    }

    const ARCHIVE_DIR: &str = "/var/lib/twitter/archive";

    /// Needs its archive directory to exist on the filesystem it is given.
    fn archive_cmd(fs: Arc<dyn FileSystem>) -> Result<CommandNode> {
        if !fs.exists(Path::new(ARCHIVE_DIR)) {
            return Err(CliError::Command(format!(
                "archive directory '{ARCHIVE_DIR}' not found"
            )));
        }
        Ok(CommandNode::new("archive", "Archive collected tweets"))
    }

    fn reserved_flag_cmd(_fs: Arc<dyn FileSystem>) -> Result<CommandNode> {
        let mut cmd = CommandNode::new("collect", "Collect tweets");
        cmd.register_flag(FlagDescriptor::new("help", "custom help"))?;
        Ok(cmd)
    }

    fn bad_flag_cmd(_fs: Arc<dyn FileSystem>) -> Result<CommandNode> {
        let mut cmd = CommandNode::new("collect", "Collect tweets");
        cmd.register_flag(FlagDescriptor::new("query", "search query"))?;
        cmd.register_flag(FlagDescriptor::new("query", "again"))?;
        Ok(cmd)
    }

    fn shadowing_cmd(_fs: Arc<dyn FileSystem>) -> Result<CommandNode> {
        let mut cmd = CommandNode::new("collect", "Collect tweets");
        cmd.register_flag(FlagDescriptor::new(DB_PATH_FLAG, "local db"))?;
        Ok(cmd)
    }

    #[test]
    fn test_root_has_global_flags_and_subcommands() {
        let root = build(MemoryFs::new());
        let node = root.node();

        assert_eq!(node.name(), APP_NAME);
        let persistent: Vec<&str> = node.flags().persistent().map(|f| f.name.as_str()).collect();
        assert_eq!(persistent, vec![CONFIG_FLAG, DB_PATH_FLAG]);
        assert_eq!(root.settings().bound_key(DB_PATH_FLAG), Some(DB_PATH_KEY));
        assert_eq!(node.children().len(), SUBCOMMANDS.len());
        assert!(node.child("config").is_some());
    }

    #[test]
    fn test_failing_constructor_aborts_build() {
        let result = new_root_cmd_with(
            Arc::new(MemoryFs::new()),
            Box::new(MapEnv::new()),
            &[commands::config::new_config_cmd, archive_cmd],
        );
        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "archive directory '/var/lib/twitter/archive' not found"
        );

        let fs = MemoryFs::new();
        fs.create_dir_all(Path::new(ARCHIVE_DIR)).unwrap();
        let root = new_root_cmd_with(
            Arc::new(fs),
            Box::new(MapEnv::new()),
            &[commands::config::new_config_cmd, archive_cmd],
        )
        .unwrap();
        assert!(root.node().child("archive").is_some());
    }

    #[test]
    fn test_reserved_flag_name_aborts_build() {
        let err = new_root_cmd_with(
            Arc::new(MemoryFs::new()),
            Box::new(MapEnv::new()),
            &[reserved_flag_cmd],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CliError::Flag(FlagError::ReservedName(ref name)) if name == "help"
        ));
    }

    #[test]
    fn test_duplicate_flag_in_constructor_aborts_build() {
        let err = new_root_cmd_with(
            Arc::new(MemoryFs::new()),
            Box::new(MapEnv::new()),
            &[bad_flag_cmd],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CliError::Flag(FlagError::DuplicateFlag { .. })
        ));
    }

    #[test]
    fn test_shadowed_global_flag_aborts_build() {
        let err = new_root_cmd_with(
            Arc::new(MemoryFs::new()),
            Box::new(MapEnv::new()),
            &[shadowing_cmd],
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Flag(FlagError::ShadowedFlag { .. })));
    }

    #[test]
    fn test_duplicate_subcommand_aborts_build() {
        let err = new_root_cmd_with(
            Arc::new(MemoryFs::new()),
            Box::new(MapEnv::new()),
            &[
                commands::config::new_config_cmd,
                commands::config::new_config_cmd,
            ],
        )
        .unwrap_err();
        assert!(matches!(err, CliError::DuplicateCommand { .. }));
    }

    #[test]
    fn test_db_path_flag_without_config_file() {
        let mut root = build(MemoryFs::new());

        let (result, out, diag) = run(
            &mut root,
            &["twitter", "--db-path", "/tmp/x.db", "config", "get", "DBPath"],
        );

        result.unwrap();
        assert_eq!(out, "/tmp/x.db\n");
        assert!(!diag.contains("Using config file"));
        assert_eq!(root.settings().db_path(), Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(root.settings().source(), &ConfigSource::EnvironmentOnly);
    }

    #[test]
    fn test_db_path_flag_after_subcommand() {
        let mut root = build(MemoryFs::new());

        let (result, out, _) = run(
            &mut root,
            &["twitter", "config", "get", "DBPath", "--db-path", "/tmp/y.db"],
        );

        result.unwrap();
        assert_eq!(out, "/tmp/y.db\n");
    }

    #[test]
    fn test_flag_overrides_config_file() {
        let fs = MemoryFs::new().with_file(
            "/home/tester/.config/.twitter.yaml",
            "DBPath: /file.db\n",
        );
        let mut root = build(fs);

        let (result, out, diag) = run(
            &mut root,
            &["twitter", "config", "get", "DBPath", "--db-path", "/flag.db"],
        );

        result.unwrap();
        assert_eq!(out, "/flag.db\n");
        assert_eq!(
            diag,
            "Using config file: /home/tester/.config/.twitter.yaml\n"
        );
    }

    #[test]
    fn test_explicit_config_flag() {
        let fs = MemoryFs::new()
            .with_file("/srv/twitter.yml", "DBPath: /srv/tweets.db\n")
            .with_file("/home/tester/.config/.twitter.yaml", "DBPath: /home.db\n");
        let mut root = new_root_cmd(Arc::new(fs), Box::new(MapEnv::new())).unwrap();

        let (result, out, diag) = run(
            &mut root,
            &["twitter", "--config", "/srv/twitter.yml", "config", "path"],
        );

        result.unwrap();
        assert_eq!(out, "/srv/twitter.yml\n");
        assert_eq!(diag, "Using config file: /srv/twitter.yml\n");
        assert_eq!(
            root.settings().db_path(),
            Some(PathBuf::from("/srv/tweets.db"))
        );
    }

    #[test]
    fn test_unknown_subcommand_is_usage_error() {
        let mut root = build(MemoryFs::new());

        let (result, out, _) = run(&mut root, &["twitter", "collect"]);

        let err = result.unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
        assert!(err.to_string().contains("collect"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_home_dir_failure_surfaces() {
        let mut root = new_root_cmd(Arc::new(MemoryFs::new()), Box::new(MapEnv::new())).unwrap();

        let (result, _, _) = run(&mut root, &["twitter", "config", "path"]);

        assert!(matches!(
            result.unwrap_err(),
            CliError::Config(twitter_core::ConfigError::HomeDirNotFound)
        ));
    }

    #[test]
    fn test_help_and_version_succeed() {
        let mut root = build(MemoryFs::new());

        let (result, out, _) = run(&mut root, &["twitter", "--help"]);
        result.unwrap();
        assert!(out.contains("CLI for collect tweets"));
        assert!(out.contains("--db-path"));

        let (result, out, _) = run(&mut root, &["twitter", "--version"]);
        result.unwrap();
        assert_eq!(out, format!("twitter {APP_VERSION}\n"));
    }

    #[test]
    fn test_bare_root_prints_help() {
        let mut root = build(MemoryFs::new());

        let (result, out, _) = run(&mut root, &["twitter"]);

        result.unwrap();
        assert!(out.contains("Usage: twitter"));
        assert!(out.contains("config"));
    }
}
