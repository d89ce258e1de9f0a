use crate::env::Environment;
use crate::registry::Registry;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// 0 indicates success, positive values indicate failure. A negative value means the
/// program could not be executed at all.
pub type ExitCode = i32;

/// Arguments handed to a command handler for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInput {
    /// Name the command was invoked by.
    pub name: String,
    /// Remaining words of the line, quotes removed.
    pub args: Vec<String>,
}

impl CommandInput {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// True when the only argument is a help flag (`-?` or `--help`).
    pub fn is_help_request(&self) -> bool {
        matches!(self.args.as_slice(), [flag] if flag == "-?" || flag == "--help")
    }
}

/// How the arguments of a command are completed in the line editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgCompleter {
    /// Arguments are not completed.
    Nothing,
    /// Complete from a fixed set of option flags.
    Options(Vec<&'static str>),
    /// Complete file and directory names.
    Files,
}

/// Object-safe handler for a command stored in the [`Registry`].
///
/// Implemented by built-ins (see the `builtin` module) and by any subsystem that wants
/// to contribute commands to the same lookup table.
pub trait CommandHandler {
    /// One-line description shown by `help`.
    fn description(&self) -> &str;

    /// Executes the command.
    ///
    /// Output goes to `stdout`; state changes go through `env`. The registry is
    /// available read-only for commands that describe other commands.
    fn execute(
        &self,
        input: &CommandInput,
        stdout: &mut dyn Write,
        env: &mut Environment,
        registry: &Registry,
    ) -> Result<ExitCode>;

    /// Completion strategy for this command's arguments.
    fn completer(&self) -> ArgCompleter {
        ArgCompleter::Options(vec!["-?", "--help"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_request_detection() {
        let help = |args: &[&str]| {
            CommandInput::new("x", args.iter().map(|a| a.to_string()).collect()).is_help_request()
        };
        assert!(help(&["-?"]));
        assert!(help(&["--help"]));
        assert!(!help(&[]));
        assert!(!help(&["ls", "--help"]));
        assert!(!help(&["-h"]));
    }
}
