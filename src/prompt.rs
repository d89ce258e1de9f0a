//! Prompt rendering: `user@host cwd HH:MM:SS ❯ `.

use crate::env::Environment;
use chrono::Local;
use std::path::Path;

/// Plain prompt used when the user or host cannot be determined.
pub const FALLBACK_PROMPT: &str = "sandbox> ";

const RESET: &str = "\x1b[0m";
const USER_HOST: &str = "\x1b[1;32m";
const CWD: &str = "\x1b[1;34m";
const CLOCK: &str = "\x1b[2m";
const ARROW: &str = "\x1b[1;35m";

/// Renders the decorated prompt for the current session state.
pub fn render(env: &Environment) -> String {
    let user = env
        .get_var("USER")
        .or_else(|| env.get_var("USERNAME"))
        .filter(|user| !user.is_empty());
    let host = hostname::get()
        .ok()
        .and_then(|host| host.into_string().ok())
        .filter(|host| !host.is_empty());
    let (Some(user), Some(host)) = (user, host) else {
        return FALLBACK_PROMPT.to_string();
    };

    let cwd = display_dir(env.work_dir(), env.home_dir().as_deref());
    let time = Local::now().format("%H:%M:%S");
    format!("{USER_HOST}{user}@{host}{RESET} {CWD}{cwd}{RESET} {CLOCK}{time}{RESET} {ARROW}❯{RESET} ")
}

/// Shortens `dir` to `~/...` when it lies under `home`.
fn display_dir(dir: &Path, home: Option<&Path>) -> String {
    match home.and_then(|home| dir.strip_prefix(home).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~{}{}", std::path::MAIN_SEPARATOR, rest.display()),
        None => dir.display().to_string(),
    }
}
