//! End-to-end tests driving the `twitter` binary with an isolated home
//! directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Runs the binary with `HOME` pointed at `home` and config-related
/// variables cleared.
fn twitter(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_twitter"))
        .args(args)
        .env("HOME", home)
        .env_remove("DBPath")
        .env_remove("DBPATH")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run twitter")
}

fn twitter_with_env(home: &Path, args: &[&str], vars: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_twitter"));
    cmd.args(args)
        .env("HOME", home)
        .env_remove("DBPath")
        .env_remove("DBPATH")
        .env_remove("RUST_LOG");
    for (name, value) in vars {
        cmd.env(name, value);
    }
    cmd.output().expect("failed to run twitter")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Writes `~/.config/.twitter.<ext>` under `home`.
fn write_home_config(home: &Path, ext: &str, contents: &str) -> PathBuf {
    let dir = home.join(".config");
    fs::create_dir_all(&dir).expect("failed to create config dir");
    let path = dir.join(format!(".twitter.{ext}"));
    fs::write(&path, contents).expect("failed to write config");
    path
}

// ---------------------------------------------------------------------------
// Configuration resolution
// ---------------------------------------------------------------------------

#[test]
fn db_path_flag_without_config_file() {
    let home = TempDir::new().unwrap();

    let output = twitter(
        home.path(),
        &["--db-path", "/tmp/x.db", "config", "get", "DBPath"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "/tmp/x.db\n");
    assert!(!stderr(&output).contains("Using config file"));
}

#[test]
fn discovered_config_file_is_announced_on_stderr() {
    let home = TempDir::new().unwrap();
    let path = write_home_config(home.path(), "yaml", "DBPath: /data/tweets.db\n");

    let output = twitter(home.path(), &["config", "get", "DBPath"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "/data/tweets.db\n");
    assert!(
        stderr(&output).contains(&format!("Using config file: {}", path.display())),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn json_config_file_is_discovered() {
    let home = TempDir::new().unwrap();
    write_home_config(home.path(), "json", r#"{"DBPath": "/json/tweets.db"}"#);

    let output = twitter(home.path(), &["config", "get", "dbpath"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "/json/tweets.db\n");
}

#[test]
fn explicit_config_flag_skips_home() {
    let home = TempDir::new().unwrap();
    write_home_config(home.path(), "yaml", "DBPath: /home.db\n");
    let other = TempDir::new().unwrap();
    let explicit = other.path().join("custom.yaml");
    fs::write(&explicit, "DBPath: /explicit.db\n").unwrap();

    let output = twitter(
        home.path(),
        &[
            "--config",
            explicit.to_str().unwrap(),
            "config",
            "get",
            "DBPath",
        ],
    );

    assert!(output.status.success());
    assert_eq!(stdout(&output), "/explicit.db\n");
    assert!(stderr(&output).contains(&format!("Using config file: {}", explicit.display())));
}

#[test]
fn environment_variable_is_fallback() {
    let home = TempDir::new().unwrap();

    let output = twitter_with_env(
        home.path(),
        &["config", "get", "DBPath"],
        &[("DBPATH", "/env/tweets.db")],
    );

    assert!(output.status.success());
    assert_eq!(stdout(&output), "/env/tweets.db\n");
    assert!(stderr(&output).is_empty());
}

#[test]
fn config_path_reports_none_without_file() {
    let home = TempDir::new().unwrap();

    let output = twitter(home.path(), &["config", "path"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "(none)\n");
    assert!(stderr(&output).is_empty());
}

// ---------------------------------------------------------------------------
// Dispatch and exit codes
// ---------------------------------------------------------------------------

#[test]
fn unknown_subcommand_exits_with_one() {
    let home = TempDir::new().unwrap();

    let output = twitter(home.path(), &["collect"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stdout(&output).contains("unrecognized subcommand 'collect'"),
        "stdout: {}",
        stdout(&output)
    );
}

#[test]
fn command_failure_exits_with_one() {
    let home = TempDir::new().unwrap();

    let output = twitter(home.path(), &["config", "get", "missing"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "config key \"missing\" is not set\n");
}

#[test]
fn help_exits_with_zero() {
    let home = TempDir::new().unwrap();

    let output = twitter(home.path(), &["--help"]);

    assert!(output.status.success());
    let help = stdout(&output);
    assert!(help.contains("CLI for collect tweets"));
    assert!(help.contains("--config"));
    assert!(help.contains("--db-path"));
}

#[test]
fn bare_invocation_prints_help() {
    let home = TempDir::new().unwrap();

    let output = twitter(home.path(), &[]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage: twitter"));
}

// ---------------------------------------------------------------------------
// config init
// ---------------------------------------------------------------------------

#[test]
fn init_then_discover() {
    let home = TempDir::new().unwrap();

    let output = twitter(
        home.path(),
        &["--db-path", "/data/t.db", "config", "init"],
    );
    assert!(output.status.success(), "stdout: {}", stdout(&output));

    let expected = home.path().join(".config").join(".twitter.yaml");
    assert!(expected.exists());
    assert_eq!(
        stdout(&output),
        format!("Config file created at: {}\n", expected.display())
    );

    let output = twitter(home.path(), &["config", "path"]);
    assert_eq!(stdout(&output), format!("{}\n", expected.display()));

    let output = twitter(home.path(), &["config", "init"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("already exists"));
}
