use anyhow::{Context, Result};
use sandbox_shell::config::{ConfigPath, Options};
use sandbox_shell::executor::SPAWN_FAILED;
use sandbox_shell::{
    EditorLineSource, Environment, LineSource, LoopExit, ReaderLineSource, Registry, Repl,
};
use std::io::{self, IsTerminal};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit code for `-c` when the program could not be started, as in POSIX shells.
const NOT_FOUND_EXIT: i32 = 127;

fn main() -> Result<()> {
    let options: Options = argh::from_env();
    init_tracing(options.log_level.as_deref());

    // SIGINT is meant for the foreground program; the shell itself keeps running.
    // Line editing reads keys in raw mode and reports Ctrl-C as an interrupted read.
    ctrlc::set_handler(|| {}).context("failed to set ctrl-c handler")?;

    let env = Environment::new();
    let registry = Registry::with_builtins();

    if let Some(line) = options.command.as_deref() {
        let mut repl = Repl::new(registry, env, Box::new(ReaderLineSource::new(io::empty())));
        let code = match repl.dispatch(line) {
            Some(SPAWN_FAILED) => NOT_FOUND_EXIT,
            Some(code) => code,
            None => 0,
        };
        process::exit(code);
    }

    let history_file = if options.no_history {
        None
    } else {
        let config = ConfigPath::resolve(options.config_dir, &env)?;
        config.ensure()?;
        Some(config.history_file())
    };

    let source: Box<dyn LineSource> = if io::stdin().is_terminal() {
        Box::new(EditorLineSource::new(&registry, history_file)?)
    } else {
        debug!("stdin is not a terminal, reading lines without an editor");
        Box::new(ReaderLineSource::new(io::stdin().lock()))
    };

    match Repl::new(registry, env, source).run()? {
        LoopExit::Exit(code) => process::exit(code),
        LoopExit::EndOfInput => Ok(()),
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
