//! `twitter config`: inspect and initialize configuration.
//!
//! ```text
//! twitter config path                 # config file in use, or (none)
//! twitter config get DBPath           # one resolved value
//! twitter config show --format json   # every known key
//! twitter config init                 # write a starter YAML file
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use serde_yaml::{Mapping, Value};
use twitter_core::{FileSystem, FlagDescriptor, Settings, ValueOrigin};

use crate::command::{CommandNode, Context};
use crate::error::{CliError, Result};
use crate::root::CONFIG_FLAG;

/// Shown when no config file was loaded.
const NO_CONFIG_FILE: &str = "(none)";

/// Output formats accepted by `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShowFormat {
    Yaml,
    Json,
}

impl ShowFormat {
    fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(CliError::Command(format!(
                "unsupported format {other:?} (expected yaml or json)"
            ))),
        }
    }
}

/// Builds the `config` command tree.
pub fn new_config_cmd(fs: Arc<dyn FileSystem>) -> Result<CommandNode> {
    let mut cmd = CommandNode::new("config", "Inspect and initialize configuration");

    cmd.add_child(
        CommandNode::new("path", "Print the config file in use").with_handler(run_path),
    )?;
    cmd.add_child(
        CommandNode::new("get", "Print the resolved value of a config key")
            .with_arg("key", "Config key (case-insensitive, dotted for nesting)", true)
            .with_handler(run_get),
    )?;

    let mut show = CommandNode::new("show", "Print every known config key").with_handler(run_show);
    show.register_flag(
        FlagDescriptor::new("format", "Output format (yaml|json)")
            .bind_to("output.format")
            .with_default("yaml"),
    )?;
    cmd.add_child(show)?;

    cmd.add_child(
        CommandNode::new("init", "Write a starter config file")
            .with_handler(move |ctx| run_init(ctx, fs.as_ref())),
    )?;

    Ok(cmd)
}

fn run_path(ctx: &mut Context<'_>) -> Result<()> {
    match ctx.settings.config_file_used() {
        Some(path) => writeln!(ctx.out, "{}", path.display())?,
        None => writeln!(ctx.out, "{NO_CONFIG_FILE}")?,
    }
    Ok(())
}

fn run_get(ctx: &mut Context<'_>) -> Result<()> {
    let key = ctx
        .arg("key")
        .ok_or_else(|| CliError::Command("missing config key".to_string()))?
        .to_string();
    let value = ctx
        .settings
        .get(&key)
        .ok_or_else(|| CliError::Command(format!("config key {key:?} is not set")))?;
    writeln!(ctx.out, "{value}")?;
    Ok(())
}

fn run_show(ctx: &mut Context<'_>) -> Result<()> {
    let format = ShowFormat::parse(&ctx.flag("format").unwrap_or_default())?;
    let values = ctx.settings.all();

    let rendered = match format {
        ShowFormat::Yaml => serde_yaml::to_string(&values)?,
        ShowFormat::Json => format!("{}\n", serde_json::to_string_pretty(&values)?),
    };
    write!(ctx.out, "{rendered}")?;
    Ok(())
}

fn run_init(ctx: &mut Context<'_>, fs: &dyn FileSystem) -> Result<()> {
    let target = init_target(ctx.settings)?;
    if fs.exists(&target) {
        return Err(CliError::Command(format!(
            "config file '{}' already exists",
            target.display()
        )));
    }

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs.create_dir_all(parent)?;
        }
    }
    let raw = serde_yaml::to_string(&starter_config(ctx.settings))?;
    fs.write(&target, raw.as_bytes())?;

    tracing::info!(path = %target.display(), "config file created");
    writeln!(ctx.out, "Config file created at: {}", target.display())?;
    Ok(())
}

/// `--config` if given on the command line, otherwise the default location.
fn init_target(settings: &Settings) -> Result<PathBuf> {
    match settings.lookup(CONFIG_FLAG) {
        Some((path, ValueOrigin::Flag)) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(settings.default_config_path()?),
    }
}

/// Every bound key with its current value, nested on `.`.
fn starter_config(settings: &Settings) -> Value {
    let mut root = Mapping::new();
    for key in settings.bound_keys() {
        if key.eq_ignore_ascii_case(CONFIG_FLAG) {
            continue;
        }
        let value = settings.get(key).unwrap_or_default();
        insert_dotted(&mut root, key, Value::String(value));
    }
    Value::Mapping(root)
}

fn insert_dotted(map: &mut Mapping, key: &str, value: Value) {
    let Some((head, rest)) = key.split_once('.') else {
        map.insert(Value::String(key.to_string()), value);
        return;
    };

    if !matches!(map.get(head), Some(Value::Mapping(_))) {
        map.insert(Value::String(head.to_string()), Value::Mapping(Mapping::new()));
    }
    if let Some(Value::Mapping(inner)) = map.get_mut(head) {
        insert_dotted(inner, rest, value);
    }
}
