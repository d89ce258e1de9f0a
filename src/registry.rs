//! Lookup table from command name to handler.

use crate::builtin::{self, BuiltinCommand, Factory, ShellEscape};
use crate::command::{ArgCompleter, CommandHandler};
use crate::parser;
use anyhow::{Result, bail};
use std::collections::HashMap;
use tracing::debug;

/// A named command owned by the [`Registry`].
pub struct CommandEntry {
    name: String,
    handler: Box<dyn CommandHandler>,
}

impl CommandEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &dyn CommandHandler {
        self.handler.as_ref()
    }

    pub fn description(&self) -> &str {
        self.handler.description()
    }

    pub fn completer(&self) -> ArgCompleter {
        self.handler.completer()
    }
}

/// Commands the shell resolves internally instead of spawning a process.
///
/// Populated once at startup and read-only while the loop runs.
pub struct Registry {
    entries: HashMap<String, CommandEntry>,
}

impl Registry {
    /// An empty registry. See [`Registry::with_builtins`] for the usual set.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry holding the built-in commands: `clear`, `exit`, `!`, `help`, `cd`
    /// and `pwd`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.add_builtin::<builtin::ClearScreen>();
        registry.add_builtin::<builtin::Exit>();
        registry.add_builtin::<builtin::Help>();
        registry.add_builtin::<builtin::Cd>();
        registry.add_builtin::<builtin::Pwd>();
        registry.insert(builtin::SHELL_ESCAPE.to_string(), Box::new(ShellEscape));
        registry
    }

    /// Adds a command contributed from outside the built-in set.
    ///
    /// Fails when the name is already taken or could never be typed as the first word
    /// of a line: it must be one token starting with a letter or `!`, optionally
    /// preceded by `:`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Box<dyn CommandHandler>,
    ) -> Result<()> {
        let name = name.into();
        if !parser::is_command_name(&name) {
            bail!(
                "invalid command name {name:?}: must be a single word starting with a letter or `!`, optionally after `:`"
            );
        }
        if self.entries.contains_key(&name) {
            bail!("command {name:?} is already registered");
        }
        self.insert(name, handler);
        Ok(())
    }

    /// True when `name` resolves to a registered command.
    pub fn is_command(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn add_builtin<T: BuiltinCommand + 'static>(&mut self) {
        self.insert(T::name().to_string(), Box::new(Factory::<T>::default()));
    }

    fn insert(&mut self, name: String, handler: Box<dyn CommandHandler>) {
        debug!(command = %name, "registering command");
        self.entries
            .insert(name.clone(), CommandEntry { name, handler });
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
