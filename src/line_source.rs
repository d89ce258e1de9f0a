//! Where input lines come from.
//!
//! [`EditorLineSource`] drives an interactive terminal through `rustyline` (history,
//! completion, multi-line continuation). [`ReaderLineSource`] reads from any
//! [`BufRead`], which covers piped stdin.

use crate::command::ArgCompleter;
use crate::lexer;
use crate::registry::Registry;
use anyhow::{Context as _, Result};
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hint, Hinter};
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{CompletionType, Config, Context, Editor, Helper};
use std::io::{self, BufRead};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Result of one read from a [`LineSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete logical line (may span several physical lines).
    Line(String),
    /// The user interrupted the read; the partially typed input is gone.
    Interrupted,
    /// No more input. `partial` holds text that was typed but never submitted.
    Eof { partial: Option<String> },
}

/// A line could not be decoded. The offending bytes are consumed, so the next read
/// continues after them.
#[derive(Debug, Error)]
#[error("input line is not valid UTF-8; skipped")]
pub struct InvalidInput;

/// Yields one logical line per call.
pub trait LineSource {
    /// Blocks until a line, an interrupt or end of input.
    ///
    /// An [`InvalidInput`] error leaves the source usable; any other error does not.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Records a dispatched line in the input history.
    fn add_history(&mut self, _line: &str) -> Result<()> {
        Ok(())
    }

    /// Releases the source, persisting history where there is any.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Line source over a buffered reader.
///
/// Lines are accumulated while a quote or bracket group is open. Text after the last
/// newline, or an incomplete group at end of input, is reported as the partial line
/// of [`ReadOutcome::Eof`].
pub struct ReaderLineSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderLineSource<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
        let mut pending = String::new();
        loop {
            let read = match self.reader.read_line(&mut pending) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    debug!(error = %e, "discarding undecodable input");
                    return Err(InvalidInput.into());
                }
                Err(e) => return Err(anyhow::Error::new(e).context("failed to read input")),
            };
            if read == 0 || !pending.ends_with('\n') {
                let partial = pending.trim_end_matches(['\r', '\n']);
                return Ok(ReadOutcome::Eof {
                    partial: (!partial.is_empty()).then(|| partial.to_string()),
                });
            }
            let line = pending.trim_end_matches(['\r', '\n']);
            if !lexer::is_incomplete(line) {
                return Ok(ReadOutcome::Line(line.to_string()));
            }
        }
    }
}

/// Interactive line source backed by a `rustyline` editor.
pub struct EditorLineSource {
    editor: Editor<ShellHelper, DefaultHistory>,
    history_file: Option<PathBuf>,
}

impl EditorLineSource {
    /// Creates the editor, wires completion for the commands in `registry` and loads
    /// `history_file` when it exists.
    pub fn new(registry: &Registry, history_file: Option<PathBuf>) -> Result<Self> {
        let config = Config::builder()
            .auto_add_history(false)
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .build();
        let mut editor: Editor<ShellHelper, DefaultHistory> =
            Editor::with_config(config).context("failed to initialize line editor")?;
        editor.set_helper(Some(ShellHelper::new(registry)));

        if let Some(path) = &history_file {
            if path.exists() {
                editor
                    .load_history(path)
                    .with_context(|| format!("failed to load history from {}", path.display()))?;
                debug!(path = %path.display(), "loaded history");
            }
        }

        Ok(Self {
            editor,
            history_file,
        })
    }
}

impl LineSource for EditorLineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof { partial: None }),
            Err(ReadlineError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                debug!(error = %e, "discarding undecodable input");
                Err(InvalidInput.into())
            }
            Err(e) => Err(anyhow::Error::new(e).context("failed to read input line")),
        }
    }

    fn add_history(&mut self, line: &str) -> Result<()> {
        self.editor
            .add_history_entry(line)
            .context("failed to add history entry")?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(path) = &self.history_file else {
            return Ok(());
        };
        if let Err(e) = self.editor.save_history(path) {
            warn!(path = %path.display(), error = %e, "failed to save history");
            return Err(anyhow::Error::new(e)
                .context(format!("failed to save history to {}", path.display())));
        }
        debug!(path = %path.display(), "saved history");
        Ok(())
    }
}

/// Completion and continuation rules for the editor.
pub struct ShellHelper {
    commands: Vec<CommandInfo>,
    files: FilenameCompleter,
}

struct CommandInfo {
    name: String,
    description: String,
    completer: ArgCompleter,
}

/// Description of the command being typed, shown after the cursor.
///
/// Display only: accepting the hint inserts nothing into the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHint(String);

impl Hint for CommandHint {
    fn display(&self) -> &str {
        &self.0
    }

    fn completion(&self) -> Option<&str> {
        None
    }
}

impl ShellHelper {
    /// Snapshots command names and completers; the registry does not change once the
    /// loop runs.
    pub fn new(registry: &Registry) -> Self {
        let commands = registry
            .names()
            .into_iter()
            .filter_map(|name| registry.lookup(name))
            .map(|entry| CommandInfo {
                name: entry.name().to_string(),
                description: entry.description().to_string(),
                completer: entry.completer(),
            })
            .collect();
        Self {
            commands,
            files: FilenameCompleter::new(),
        }
    }

    fn find(&self, command: &str) -> Option<&CommandInfo> {
        self.commands.iter().find(|info| info.name == command)
    }
}

fn pairs<'a>(candidates: impl Iterator<Item = &'a str>, prefix: &str) -> Vec<Pair> {
    candidates
        .filter(|candidate| candidate.starts_with(prefix))
        .map(|candidate| Pair {
            display: candidate.to_string(),
            replacement: candidate.to_string(),
        })
        .collect()
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        let word_start = head
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8());
        let prefix = &head[word_start..];

        if head[..word_start].trim().is_empty() {
            let names = pairs(self.commands.iter().map(|info| info.name.as_str()), prefix);
            if !names.is_empty() {
                return Ok((word_start, names));
            }
            return self.files.complete(line, pos, ctx);
        }

        let command = head.split_whitespace().next().unwrap_or_default();
        match self.find(command).map(|info| &info.completer) {
            Some(ArgCompleter::Nothing) => Ok((pos, Vec::new())),
            Some(ArgCompleter::Options(options)) => {
                Ok((word_start, pairs(options.iter().copied(), prefix)))
            }
            Some(ArgCompleter::Files) | None => self.files.complete(line, pos, ctx),
        }
    }
}

impl Hinter for ShellHelper {
    type Hint = CommandHint;

    /// While only a registered command name has been typed, shows its description.
    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<CommandHint> {
        if pos < line.len() {
            return None;
        }
        let mut words = line.split_whitespace();
        let info = self.find(words.next()?)?;
        if words.next().is_some() {
            return None;
        }
        let gap = if line.ends_with(char::is_whitespace) { " " } else { "  " };
        Some(CommandHint(format!("{gap}{}", info.description)))
    }
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        if lexer::is_incomplete(ctx.input()) {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

impl Helper for ShellHelper {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(input: &str) -> ReaderLineSource<Cursor<Vec<u8>>> {
        ReaderLineSource::new(Cursor::new(input.as_bytes().to_vec()))
    }

    fn line(text: &str) -> ReadOutcome {
        ReadOutcome::Line(text.to_string())
    }

    #[test]
    fn test_reader_yields_lines_then_eof() {
        let mut source = reader("ls -la\r\npwd\n");
        assert_eq!(source.read_line("> ").unwrap(), line("ls -la"));
        assert_eq!(source.read_line("> ").unwrap(), line("pwd"));
        assert_eq!(
            source.read_line("> ").unwrap(),
            ReadOutcome::Eof { partial: None }
        );
    }

    #[test]
    fn test_reader_unsubmitted_text_is_partial() {
        let mut source = reader("pwd\nec");
        assert_eq!(source.read_line("> ").unwrap(), line("pwd"));
        assert_eq!(
            source.read_line("> ").unwrap(),
            ReadOutcome::Eof {
                partial: Some("ec".to_string())
            }
        );
    }

    #[test]
    fn test_reader_joins_open_groups() {
        let mut source = reader("echo 'a\nb'\nrun (x\ny)\n");
        assert_eq!(source.read_line("> ").unwrap(), line("echo 'a\nb'"));
        assert_eq!(source.read_line("> ").unwrap(), line("run (x\ny)"));
    }

    #[test]
    fn test_reader_open_group_at_eof_is_partial() {
        let mut source = reader("echo 'never closed\n");
        assert_eq!(
            source.read_line("> ").unwrap(),
            ReadOutcome::Eof {
                partial: Some("echo 'never closed".to_string())
            }
        );
    }

    #[test]
    fn test_reader_skips_undecodable_line() {
        let mut source = ReaderLineSource::new(Cursor::new(b"pwd\n\xff\xfe\nexit\n".to_vec()));
        assert_eq!(source.read_line("> ").unwrap(), line("pwd"));
        let err = source.read_line("> ").unwrap_err();
        assert!(err.downcast_ref::<InvalidInput>().is_some());
        assert_eq!(source.read_line("> ").unwrap(), line("exit"));
    }

    #[test]
    fn test_helper_hints_command_description() {
        let helper = ShellHelper::new(&Registry::with_builtins());
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let hint = helper.hint("clear", 5, &ctx).unwrap();
        assert_eq!(hint.display(), "  clear terminal");
        assert_eq!(hint.completion(), None);
        assert_eq!(helper.hint("pwd ", 4, &ctx).unwrap().display(), " print working directory");

        assert!(helper.hint("clear -x", 8, &ctx).is_none());
        assert!(helper.hint("clear", 2, &ctx).is_none());
        assert!(helper.hint("ls", 2, &ctx).is_none());
        assert!(helper.hint("", 0, &ctx).is_none());
    }

    #[test]
    fn test_helper_completes_command_names() {
        let helper = ShellHelper::new(&Registry::with_builtins());
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (start, candidates) = helper.complete("cl", 2, &ctx).unwrap();
        assert_eq!(start, 0);
        let names: Vec<_> = candidates.iter().map(|p| p.replacement.as_str()).collect();
        assert_eq!(names, vec!["clear"]);

        let (start, candidates) = helper.complete("  e", 3, &ctx).unwrap();
        assert_eq!(start, 2);
        assert_eq!(candidates[0].replacement, "exit");
    }

    #[test]
    fn test_helper_completes_options() {
        let helper = ShellHelper::new(&Registry::with_builtins());
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (start, candidates) = helper.complete("exit --h", 8, &ctx).unwrap();
        assert_eq!(start, 5);
        let names: Vec<_> = candidates.iter().map(|p| p.replacement.as_str()).collect();
        assert_eq!(names, vec!["--help"]);
    }
}
