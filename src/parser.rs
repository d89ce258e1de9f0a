//! Turns a command line into an [`Invocation`].

use crate::lexer::{self, LexingError};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Shape of a token that may name a command: an optional `:` followed by letters or
/// `!`, then anything up to the next whitespace.
static COMMAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:?[A-Za-z!]+\S*$").expect("command pattern is a valid regex")
});

/// A program name plus its ordered argument list, produced from one input line.
///
/// `program` is never empty and `args` never contains the program itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    /// Builds an invocation from an argv-style list. Returns `None` for an empty
    /// list or an empty program name.
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next().filter(|p| !p.is_empty())?;
        Some(Self {
            program,
            args: argv.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// A malformed command line, with the 1-based position of the problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl From<LexingError> for SyntaxError {
    fn from(err: LexingError) -> Self {
        match err {
            LexingError::UnfinishedQuote {
                quote,
                line,
                column,
            } => SyntaxError {
                line,
                column,
                message: format!("unterminated quote {quote}"),
            },
            LexingError::UnclosedBracket {
                bracket,
                line,
                column,
            } => SyntaxError {
                line,
                column,
                message: format!("unclosed bracket {bracket}"),
            },
            LexingError::UnmatchedBracket {
                bracket,
                line,
                column,
            } => SyntaxError {
                line,
                column,
                message: format!("unexpected closing bracket {bracket}"),
            },
        }
    }
}

/// Splits a line into words with quotes removed.
pub fn split_words(line: &str) -> Result<Vec<String>, SyntaxError> {
    Ok(lexer::split_into_tokens(line)?
        .into_iter()
        .map(|token| token.text)
        .collect())
}

/// Parses a single command line into an [`Invocation`].
///
/// The first word becomes the program, the remaining words its arguments.
pub fn parse(line: &str) -> Result<Invocation, SyntaxError> {
    let tokens = lexer::split_into_tokens(line)?;
    if let Some(first) = tokens.first().filter(|t| t.text.is_empty()) {
        return Err(SyntaxError {
            line: first.line,
            column: first.column,
            message: "empty program name".to_string(),
        });
    }
    Invocation::from_argv(tokens.into_iter().map(|t| t.text).collect()).ok_or_else(|| {
        SyntaxError {
            line: 1,
            column: 1,
            message: "empty command".to_string(),
        }
    })
}

/// Returns the first whitespace-delimited token of `line` when it has the shape of
/// a command name, e.g. `clear`, `!ls` or `:help`.
pub fn command_name(line: &str) -> Option<&str> {
    line.split_whitespace()
        .next()
        .filter(|first| is_command_name(first))
}

/// True when `name` is a single token that [`command_name`] can return.
pub fn is_command_name(name: &str) -> bool {
    COMMAND_PATTERN.is_match(name)
}
