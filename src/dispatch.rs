//! Decides where an input line goes: a registered command or an external program.
//!
//! Lines are resolved in this order:
//! 1. the first token names a registered command: that command runs with the
//!    remaining words as its arguments;
//! 2. the first token starts with the shell-escape marker `!`: the rest of the line
//!    runs as an external program;
//! 3. anything else is rewritten as `"! " + line`, i.e. unknown input is assumed to
//!    name an external program rather than being rejected.

use crate::builtin::SHELL_ESCAPE;
use crate::command::CommandInput;
use crate::parser::{self, SyntaxError};
use crate::registry::Registry;
use tracing::trace;

/// Routing decision for one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Blank input; nothing to run.
    Empty,
    /// Invoke the registered handler.
    Builtin(CommandInput),
    /// Parse the text and run it as an external program.
    PassThrough(String),
}

/// Classifies `line` against `registry`.
///
/// Fails only when the arguments of a registered command cannot be tokenized.
pub fn classify(line: &str, registry: &Registry) -> Result<Dispatch, SyntaxError> {
    if line.trim().is_empty() {
        return Ok(Dispatch::Empty);
    }

    if let Some(name) = parser::command_name(line).filter(|name| registry.is_command(name)) {
        let mut words = parser::split_words(line)?;
        let args = words.split_off(1.min(words.len()));
        trace!(command = name, ?args, "dispatching to registered command");
        return Ok(Dispatch::Builtin(CommandInput::new(name, args)));
    }

    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix(SHELL_ESCAPE) {
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        return Ok(Dispatch::PassThrough(rest.to_string()));
    }

    if registry.is_command(SHELL_ESCAPE) {
        classify(&format!("{SHELL_ESCAPE} {line}"), registry)
    } else {
        Ok(Dispatch::PassThrough(line.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin(name: &str, args: &[&str]) -> Dispatch {
        Dispatch::Builtin(CommandInput::new(
            name,
            args.iter().map(|a| a.to_string()).collect(),
        ))
    }

    #[test]
    fn test_registered_command_gets_remaining_words() {
        let registry = Registry::with_builtins();
        assert_eq!(classify("clear", &registry).unwrap(), builtin("clear", &[]));
        assert_eq!(
            classify("  cd  'My Documents' ", &registry).unwrap(),
            builtin("cd", &["My Documents"])
        );
        assert_eq!(classify("exit --help", &registry).unwrap(), builtin("exit", &["--help"]));
    }

    #[test]
    fn test_registry_wins_over_host_programs() {
        // `pwd` and `clear` also exist as programs on most hosts.
        let registry = Registry::with_builtins();
        assert_eq!(classify("pwd", &registry).unwrap(), builtin("pwd", &[]));
        assert_eq!(classify("clear -x", &registry).unwrap(), builtin("clear", &["-x"]));
    }

    #[test]
    fn test_marker_forms() {
        let registry = Registry::with_builtins();
        assert_eq!(
            classify("!ls -la", &registry).unwrap(),
            Dispatch::PassThrough("ls -la".to_string())
        );
        assert_eq!(classify("! ls -la", &registry).unwrap(), builtin("!", &["ls", "-la"]));
        assert_eq!(classify("!", &registry).unwrap(), builtin("!", &[]));
    }

    #[test]
    fn test_unknown_input_behaves_like_escaped_input() {
        let registry = Registry::with_builtins();
        for line in [
            "ls -la /tmp",
            "./run.sh one two",
            "git commit -m 'a message'",
            "1 + 2",
            "echo (a b)",
        ] {
            assert_eq!(
                classify(line, &registry).unwrap(),
                classify(&format!("! {line}"), &registry).unwrap(),
                "line {line:?}"
            );
        }
        assert_eq!(
            classify("ls -la /tmp", &registry).unwrap(),
            builtin("!", &["ls", "-la", "/tmp"])
        );
    }

    #[test]
    fn test_unknown_input_syntax_error_matches_escaped_input() {
        let registry = Registry::with_builtins();
        let plain = classify("echo 'oops", &registry).unwrap_err();
        let escaped = classify("! echo 'oops", &registry).unwrap_err();
        assert_eq!(plain.message, escaped.message);
    }

    #[test]
    fn test_without_escape_command_falls_back_to_pass_through() {
        let registry = Registry::new();
        assert_eq!(
            classify("ls -la", &registry).unwrap(),
            Dispatch::PassThrough("ls -la".to_string())
        );
    }

    #[test]
    fn test_blank_lines_are_empty() {
        let registry = Registry::with_builtins();
        assert_eq!(classify("", &registry).unwrap(), Dispatch::Empty);
        assert_eq!(classify(" \t ", &registry).unwrap(), Dispatch::Empty);
    }
}
