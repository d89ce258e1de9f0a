//! Command-line options and the per-user configuration directory.

use crate::env::Environment;
use anyhow::{Context, Result, anyhow};
use argh::FromArgs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name created under the home directory when `--config-dir` is not given.
pub const DEFAULT_DIR_NAME: &str = ".sandbox_shell";
const HISTORY_FILE_NAME: &str = "history";

/// Interactive command shell. Unknown input runs as an external program.
#[derive(FromArgs, Debug, Default)]
pub struct Options {
    /// directory holding the history file (default: $HOME/.sandbox_shell)
    #[argh(option)]
    pub config_dir: Option<PathBuf>,

    /// do not load or save input history
    #[argh(switch)]
    pub no_history: bool,

    /// log filter, e.g. `debug` or `sandbox_shell=trace` (default: $RUST_LOG or `warn`)
    #[argh(option)]
    pub log_level: Option<String>,

    /// run a single line and exit with its status
    #[argh(option, short = 'c')]
    pub command: Option<String>,
}

/// Location of the shell's persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    root: PathBuf,
}

impl ConfigPath {
    /// Uses `explicit` when given, otherwise `<home>/.sandbox_shell`.
    pub fn resolve(explicit: Option<PathBuf>, env: &Environment) -> Result<Self> {
        let root = match explicit {
            Some(dir) if dir.is_relative() => env.work_dir().join(dir),
            Some(dir) => dir,
            None => env
                .home_dir()
                .map(|home| home.join(DEFAULT_DIR_NAME))
                .ok_or_else(|| anyhow!("cannot locate home directory; pass --config-dir"))?,
        };
        Ok(Self { root })
    }

    /// Creates the directory if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root).with_context(|| {
            format!(
                "failed to create configuration directory {}",
                self.root.display()
            )
        })?;
        debug!(path = %self.root.display(), "configuration directory ready");
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history_file(&self) -> PathBuf {
        self.root.join(HISTORY_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, argh::EarlyExit> {
        Options::from_args(&["sandbox_shell"], args)
    }

    #[test]
    fn test_options_defaults() {
        let options = parse(&[]).unwrap();
        assert!(options.config_dir.is_none());
        assert!(!options.no_history);
        assert!(options.log_level.is_none());
        assert!(options.command.is_none());
    }

    #[test]
    fn test_options_all_flags() {
        let options = parse(&[
            "--config-dir",
            "/tmp/conf",
            "--no-history",
            "--log-level",
            "debug",
            "-c",
            "ls -la",
        ])
        .unwrap();
        assert_eq!(options.config_dir, Some(PathBuf::from("/tmp/conf")));
        assert!(options.no_history);
        assert_eq!(options.log_level.as_deref(), Some("debug"));
        assert_eq!(options.command.as_deref(), Some("ls -la"));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = parse(&["--bogus"]).unwrap_err();
        assert!(err.status.is_err());
    }

    #[test]
    fn test_default_dir_under_home() {
        let mut env = Environment::new();
        env.set_var("HOME", "/home/alice");
        let config = ConfigPath::resolve(None, &env).unwrap();
        assert_eq!(config.root(), Path::new("/home/alice/.sandbox_shell"));
        assert_eq!(
            config.history_file(),
            PathBuf::from("/home/alice/.sandbox_shell/history")
        );
    }

    #[test]
    fn test_relative_dir_resolves_against_cwd() {
        let mut env = Environment::new();
        env.current_dir = PathBuf::from("/work");
        let config = ConfigPath::resolve(Some(PathBuf::from("conf")), &env).unwrap();
        assert_eq!(config.root(), Path::new("/work/conf"));
    }

    #[test]
    fn test_ensure_creates_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("a").join("b");
        let config = ConfigPath::resolve(Some(root.clone()), &Environment::new()).unwrap();
        config.ensure().unwrap();
        assert!(root.is_dir());
        config.ensure().unwrap();
    }

    #[test]
    fn test_ensure_fails_when_path_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, "").unwrap();
        let config = ConfigPath::resolve(Some(file), &Environment::new()).unwrap();
        let err = config.ensure().unwrap_err();
        assert!(err.to_string().contains("failed to create configuration directory"));
    }
}
