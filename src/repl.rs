use crate::command::ExitCode;
use crate::dispatch::{self, Dispatch};
use crate::env::Environment;
use crate::executor::{self, SPAWN_FAILED, SpawnError};
use crate::line_source::{InvalidInput, LineSource, ReadOutcome};
use crate::parser;
use crate::prompt;
use crate::registry::Registry;
use anyhow::{Result, anyhow};
use std::io::{self, Write};
use tracing::{debug, trace, warn};

/// Why [`Repl::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The `exit` command asked for termination with this status.
    Exit(ExitCode),
    /// The line source ran out of input.
    EndOfInput,
}

/// The interactive loop: prompt, read, classify, dispatch, report.
///
/// The loop owns the [`Registry`], the session [`Environment`] and the
/// [`LineSource`]. Errors from parsing or commands are written to the error writer
/// and never end the loop, and neither do undecodable input lines; only `exit`, end of
/// input or a failing line source do.
///
/// Example
/// ```
/// use sandbox_shell::{Environment, LoopExit, ReaderLineSource, Registry, Repl};
/// let source = ReaderLineSource::new("pwd\nexit\n".as_bytes());
/// let mut repl = Repl::new(Registry::with_builtins(), Environment::new(), Box::new(source))
///     .with_output(Box::new(std::io::sink()), Box::new(std::io::sink()));
/// assert_eq!(repl.run().unwrap(), LoopExit::Exit(0));
/// ```
pub struct Repl {
    env: Environment,
    registry: Registry,
    source: Box<dyn LineSource>,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    prompt: Box<dyn Fn(&Environment) -> String>,
}

impl Repl {
    /// Creates a loop writing to the process's stdout and stderr with the decorated
    /// prompt.
    pub fn new(registry: Registry, env: Environment, source: Box<dyn LineSource>) -> Self {
        Self {
            env,
            registry,
            source,
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
            prompt: Box::new(prompt::render),
        }
    }

    /// Replaces the output and error writers.
    pub fn with_output(mut self, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        self.out = out;
        self.err = err;
        self
    }

    /// Replaces the prompt renderer.
    pub fn with_prompt(mut self, prompt: impl Fn(&Environment) -> String + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs until `exit` or end of input, then closes the line source.
    ///
    /// A read failure also closes the source before the error is returned.
    pub fn run(&mut self) -> Result<LoopExit> {
        let result = self.run_until_exit();
        if let Err(e) = self.source.close() {
            self.report(&e);
        }
        self.cleanup();
        result
    }

    fn run_until_exit(&mut self) -> Result<LoopExit> {
        loop {
            self.cleanup();
            let prompt = (self.prompt)(&self.env);
            let outcome = match self.source.read_line(&prompt) {
                Ok(outcome) => outcome,
                Err(e) if e.downcast_ref::<InvalidInput>().is_some() => {
                    self.report(&e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            match outcome {
                ReadOutcome::Line(line) => {
                    self.remember(&line);
                    self.dispatch(&line);
                    if self.env.should_exit {
                        debug!("exit requested");
                        return Ok(LoopExit::Exit(0));
                    }
                }
                ReadOutcome::Interrupted => trace!("read interrupted"),
                ReadOutcome::Eof { partial } => {
                    if let Some(line) = partial.filter(|line| !line.trim().is_empty()) {
                        trace!(line = %line, "dispatching unsubmitted input");
                        self.remember(&line);
                        self.dispatch(&line);
                    }
                    debug!("end of input");
                    return Ok(if self.env.should_exit {
                        LoopExit::Exit(0)
                    } else {
                        LoopExit::EndOfInput
                    });
                }
            }
        }
    }

    /// Classifies and runs one line, reporting any failure on the error writer.
    ///
    /// Returns the command's status, or `None` for blank input. A program that could
    /// not be started reports [`SPAWN_FAILED`]; other failures report `1`.
    pub fn dispatch(&mut self, line: &str) -> Option<ExitCode> {
        match self.try_dispatch(line) {
            Ok(status) => {
                if let Some(code) = status.filter(|code| *code != 0) {
                    debug!(status = code, "command finished with non-zero status");
                }
                status
            }
            Err(e) => {
                let status = if e.downcast_ref::<SpawnError>().is_some() {
                    SPAWN_FAILED
                } else {
                    1
                };
                debug!(error = %format!("{e:#}"), status, "command failed");
                self.report(&e);
                self.env.last_status = Some(status);
                Some(status)
            }
        }
    }

    fn try_dispatch(&mut self, line: &str) -> Result<Option<ExitCode>> {
        match dispatch::classify(line, &self.registry)? {
            Dispatch::Empty => Ok(None),
            Dispatch::Builtin(input) => {
                let entry = self
                    .registry
                    .lookup(&input.name)
                    .ok_or_else(|| anyhow!("{}: command not found", input.name))?;
                let code =
                    entry
                        .handler()
                        .execute(&input, &mut *self.out, &mut self.env, &self.registry)?;
                self.env.last_status = Some(code);
                Ok(Some(code))
            }
            Dispatch::PassThrough(text) => {
                let invocation = parser::parse(&text)?;
                self.out.flush()?;
                executor::run_foreground(&invocation, &mut self.env).map(Some)
            }
        }
    }

    fn report(&mut self, e: &anyhow::Error) {
        if let Err(write_err) = writeln!(self.err, "{e:#}") {
            warn!(error = %write_err, "failed to report error");
        }
    }

    fn remember(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if let Err(e) = self.source.add_history(line) {
            debug!(error = %e, "failed to record history");
        }
    }

    /// Per-iteration cleanup: pending output reaches the terminal before the next
    /// prompt.
    fn cleanup(&mut self) {
        for writer in [&mut self.out, &mut self.err] {
            if let Err(e) = writer.flush() {
                warn!(error = %e, "failed to flush output");
            }
        }
    }
}
