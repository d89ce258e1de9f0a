//! An interactive command shell.
//!
//! Each input line is matched against a [`Registry`] of named commands. Lines whose
//! first word is a registered name run that command in-process; everything else is
//! treated as an external program and run in the foreground with inherited stdio,
//! as if it had been prefixed with the `!` shell-escape command.
//!
//! The entry point is [`Repl`], which reads lines from a [`LineSource`] (a
//! `rustyline` editor for terminals, any reader otherwise) and reports errors without
//! ever leaving the loop because of them. The modules [`command`] and [`registry`]
//! expose what is needed to contribute additional commands.

mod builtin;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod env;
pub mod executor;
mod lexer;
pub mod line_source;
pub mod parser;
pub mod prompt;
pub mod registry;
mod repl;

pub use command::{CommandHandler, CommandInput, ExitCode};
pub use env::Environment;
pub use line_source::{
    EditorLineSource, InvalidInput, LineSource, ReadOutcome, ReaderLineSource,
};
pub use registry::Registry;
pub use repl::{LoopExit, Repl};
