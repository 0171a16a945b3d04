//! Command nodes: the dispatchable tree the CLI is assembled from.
//!
//! A [`CommandNode`] carries its own [`FlagSet`], positional arguments,
//! children and an optional handler. The tree is converted to a
//! [`clap::Command`] for parsing; dispatch then walks the parsed matches back
//! down the same tree to find the handler to run.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};
use twitter_core::{FlagDescriptor, FlagError, FlagSet, Settings, is_reserved_name};

use crate::error::{CliError, Result};

/// Runs a command once its arguments are parsed and configuration resolved.
pub type Handler = Box<dyn Fn(&mut Context<'_>) -> Result<()>>;

/// What a handler sees when it runs.
pub struct Context<'a> {
    /// Resolved configuration.
    pub settings: &'a Settings,
    /// Parsed arguments of the dispatched command.
    pub matches: &'a ArgMatches,
    /// Output sink (standard output in the real binary).
    pub out: &'a mut dyn Write,
}

impl Context<'_> {
    /// Resolved value of a bound flag: the command-line value if given,
    /// otherwise the file, environment or default value of its key.
    pub fn flag(&self, name: &str) -> Option<String> {
        self.settings
            .bound_key(name)
            .and_then(|key| self.settings.get(key))
    }

    /// Value of a positional argument.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.matches.get_one::<String>(name).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct Positional {
    name: String,
    help: String,
    required: bool,
}

/// One node of the command tree.
pub struct CommandNode {
    name: String,
    about: String,
    flags: FlagSet,
    args: Vec<Positional>,
    children: Vec<CommandNode>,
    handler: Option<Handler>,
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("about", &self.about)
            .field("flags", &self.flags)
            .field("args", &self.args)
            .field("children", &self.children)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl CommandNode {
    pub fn new(name: &str, about: &str) -> Self {
        Self {
            name: name.to_string(),
            about: about.to_string(),
            flags: FlagSet::new(name),
            args: Vec::new(),
            children: Vec::new(),
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn about(&self) -> &str {
        &self.about
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    pub fn children(&self) -> &[CommandNode] {
        &self.children
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Registers a string flag on this command.
    ///
    /// The flag is bound into the configuration resolver when the node is
    /// attached to the root command.
    pub fn register_flag(&mut self, flag: FlagDescriptor) -> std::result::Result<(), FlagError> {
        self.flags.register(flag)
    }

    /// Adds a positional argument.
    pub fn with_arg(mut self, name: &str, help: &str, required: bool) -> Self {
        self.args.push(Positional {
            name: name.to_string(),
            help: help.to_string(),
            required,
        });
        self
    }

    /// Sets the function run when this command is invoked.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> Result<()> + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Attaches a child command.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::DuplicateCommand`] if a child with the same name
    /// is already attached.
    pub fn add_child(&mut self, child: CommandNode) -> Result<()> {
        if self.child(&child.name).is_some() {
            return Err(CliError::DuplicateCommand {
                parent: self.name.clone(),
                name: child.name,
            });
        }
        self.children.push(child);
        Ok(())
    }

    pub fn child(&self, name: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Finds a descendant by its path of names below this node.
    pub fn find(&self, path: &[&str]) -> Option<&CommandNode> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.child(head)?.find(rest),
        }
    }

    /// Binds every flag in this subtree into `settings`.
    ///
    /// Also checks that no flag reuses the name of a persistent flag
    /// inherited from an ancestor, and that no positional argument shares an
    /// id with a flag in scope.
    pub(crate) fn bind_all(
        &self,
        settings: &mut Settings,
        inherited: &BTreeSet<String>,
    ) -> std::result::Result<(), FlagError> {
        for flag in self.flags.iter() {
            if inherited.contains(&flag.name) {
                return Err(FlagError::ShadowedFlag {
                    command: self.name.clone(),
                    flag: flag.name.clone(),
                });
            }
            settings.bind(flag)?;
        }
        for arg in &self.args {
            if is_reserved_name(&arg.name) {
                return Err(FlagError::ReservedName(arg.name.clone()));
            }
            if self.flags.contains(&arg.name) || inherited.contains(&arg.name) {
                return Err(FlagError::ArgumentConflict {
                    command: self.name.clone(),
                    arg: arg.name.clone(),
                });
            }
        }

        let mut scope = inherited.clone();
        scope.extend(self.flags.persistent().map(|f| f.name.clone()));
        for child in &self.children {
            child.bind_all(settings, &scope)?;
        }
        Ok(())
    }

    /// Builds the clap command for this subtree.
    pub fn to_clap(&self) -> clap::Command {
        let mut cmd = clap::Command::new(self.name.clone()).about(self.about.clone());

        for flag in self.flags.iter() {
            cmd = cmd.arg(
                Arg::new(flag.name.clone())
                    .long(flag.name.clone())
                    .value_name("VALUE")
                    .help(flag.usage.clone())
                    .action(ArgAction::Set)
                    .global(flag.persistent),
            );
        }
        for arg in &self.args {
            cmd = cmd.arg(
                Arg::new(arg.name.clone())
                    .value_name(arg.name.to_ascii_uppercase())
                    .help(arg.help.clone())
                    .required(arg.required),
            );
        }
        for child in &self.children {
            cmd = cmd.subcommand(child.to_clap());
        }
        cmd
    }

    /// Records every flag the user typed on the command line.
    pub(crate) fn apply_flags(&self, matches: &ArgMatches, settings: &mut Settings) {
        for flag in self.flags.iter() {
            if matches.value_source(&flag.name) != Some(ValueSource::CommandLine) {
                continue;
            }
            if let Some(value) = matches.get_one::<String>(&flag.name) {
                settings.set_flag(&flag.name, value);
            }
        }

        if let Some((name, sub_matches)) = matches.subcommand() {
            if let Some(child) = self.child(name) {
                child.apply_flags(sub_matches, settings);
            }
        }
    }

    /// Runs the handler of the deepest matched command.
    ///
    /// A command without a handler prints its help instead.
    pub(crate) fn dispatch(
        &self,
        matches: &ArgMatches,
        settings: &Settings,
        out: &mut dyn Write,
        path: &mut Vec<String>,
    ) -> Result<()> {
        path.push(self.name.clone());

        if let Some((name, sub_matches)) = matches.subcommand() {
            if let Some(child) = self.child(name) {
                return child.dispatch(sub_matches, settings, out, path);
            }
        }

        match &self.handler {
            Some(handler) => {
                let mut ctx = Context {
                    settings,
                    matches,
                    out,
                };
                handler(&mut ctx)
            }
            None => {
                let mut cmd = self.to_clap().bin_name(path.join(" "));
                write!(out, "{}", cmd.render_help())?;
                Ok(())
            }
        }
    }
}
