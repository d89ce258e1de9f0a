use crate::command::{ArgCompleter, CommandHandler, CommandInput, ExitCode};
use crate::env::Environment;
use crate::executor;
use crate::parser::Invocation;
use crate::registry::Registry;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use crossterm::QueueableCommand;
use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Name the shell-escape command is registered under.
pub const SHELL_ESCAPE: &str = "!";

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "clear" or "cd".
    fn name() -> &'static str;

    fn description() -> &'static str;

    /// Executes the command using the session output and environment.
    fn execute(
        self,
        stdout: &mut dyn Write,
        env: &mut Environment,
        registry: &Registry,
    ) -> Result<ExitCode>;

    fn completer() -> ArgCompleter {
        ArgCompleter::Options(vec!["-?", "--help"])
    }
}

/// Registry handler for a [`BuiltinCommand`] type.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: BuiltinCommand> CommandHandler for Factory<T> {
    fn description(&self) -> &str {
        T::description()
    }

    fn execute(
        &self,
        input: &CommandInput,
        stdout: &mut dyn Write,
        env: &mut Environment,
        registry: &Registry,
    ) -> Result<ExitCode> {
        // `-?` is accepted everywhere `--help` is.
        let args: Vec<&str> = input
            .args
            .iter()
            .map(|arg| if arg == "-?" { "--help" } else { arg.as_str() })
            .collect();
        match T::from_args(&[T::name()], &args) {
            Ok(cmd) => cmd.execute(stdout, env, registry),
            Err(EarlyExit { output, status }) => {
                stdout.write_all(output.as_bytes())?;
                Ok(if status.is_err() { 1 } else { 0 })
            }
        }
    }

    fn completer(&self) -> ArgCompleter {
        T::completer()
    }
}

#[derive(FromArgs)]
/// Clear the terminal screen.
pub struct ClearScreen {}

impl BuiltinCommand for ClearScreen {
    fn name() -> &'static str {
        "clear"
    }

    fn description() -> &'static str {
        "clear terminal"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _env: &mut Environment,
        _registry: &Registry,
    ) -> Result<ExitCode> {
        stdout.queue(Clear(ClearType::All))?.queue(MoveTo(0, 0))?;
        stdout.flush()?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the shell with status 0.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn description() -> &'static str {
        "exit terminal"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        env: &mut Environment,
        _registry: &Registry,
    ) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn description() -> &'static str {
        "change working directory"
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        env: &mut Environment,
        _registry: &Registry,
    ) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => env
                .home_dir()
                .ok_or_else(|| anyhow::anyhow!("cd: no target and HOME not set"))?,
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        env.current_dir = canonical;
        Ok(0)
    }

    fn completer() -> ArgCompleter {
        ArgCompleter::Files
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn description() -> &'static str {
        "print working directory"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        env: &mut Environment,
        _registry: &Registry,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.work_dir().to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the available commands.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn description() -> &'static str {
        "list commands"
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _env: &mut Environment,
        registry: &Registry,
    ) -> Result<ExitCode> {
        let names = registry.names();
        let width = names.iter().map(|name| name.len()).max().unwrap_or(0);
        for name in names {
            if let Some(entry) = registry.lookup(name) {
                writeln!(stdout, "  {name:<width$}  {}", entry.description())?;
            }
        }
        writeln!(stdout, "Any other input is run as an external program.")?;
        Ok(0)
    }
}

/// The `!` command: runs its arguments as an external program.
///
/// Arguments are not re-parsed through argh since every flag belongs to the external
/// program. The only flag it understands is a lone `-?` or `--help`.
#[derive(Default)]
pub(crate) struct ShellEscape;

const SHELL_ESCAPE_USAGE: &str = "\
! - execute shell command
Usage: ! <command> [args...]
  -? --help                       Displays command help
";

impl CommandHandler for ShellEscape {
    fn description(&self) -> &str {
        "execute shell command"
    }

    fn execute(
        &self,
        input: &CommandInput,
        stdout: &mut dyn Write,
        env: &mut Environment,
        _registry: &Registry,
    ) -> Result<ExitCode> {
        if input.is_help_request() {
            stdout.write_all(SHELL_ESCAPE_USAGE.as_bytes())?;
            return Ok(0);
        }
        match Invocation::from_argv(input.args.clone()) {
            Some(invocation) => {
                // Pending output must reach the terminal before the child writes to it.
                stdout.flush()?;
                executor::run_foreground(&invocation, env)
            }
            None => Ok(0),
        }
    }

    fn completer(&self) -> ArgCompleter {
        ArgCompleter::Files
    }
}
