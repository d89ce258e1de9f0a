use crate::command::ExitCode;
use crate::env::Environment;
use crate::parser::Invocation;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

/// Status reported when a program could not be started.
pub const SPAWN_FAILED: ExitCode = -1;

/// An external program could not be started (not found, not executable, or the
/// operating system refused to create the process).
#[derive(Debug, Error)]
#[error("{program}: could not execute")]
pub struct SpawnError {
    pub program: String,
}

/// Runs `invocation` as a foreground process and returns its exit status.
///
/// The child inherits the terminal's stdin, stdout and stderr, the environment's
/// variables and its working directory. The call blocks until the child exits; there
/// is no timeout and no retry. Returns [`SPAWN_FAILED`] when the process could not be
/// started.
pub fn execute(invocation: &Invocation, env: &Environment) -> ExitCode {
    let program = invocation.program();
    let search_paths = env.get_var("PATH").unwrap_or_default();
    let Some(executable) =
        find_command_path(OsStr::new(&search_paths), Path::new(program), &env.current_dir)
    else {
        debug!(program, "command not found");
        return SPAWN_FAILED;
    };

    let spawned = Command::new(executable.as_ref())
        .args(invocation.args())
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            warn!(program, error = %e, "failed to spawn process");
            return SPAWN_FAILED;
        }
    };

    match child.wait() {
        Ok(status) => {
            let code = status
                .code()
                .unwrap_or_else(|| terminated_by_signal(status));
            debug!(program, code, "process exited");
            code
        }
        Err(e) => {
            warn!(program, error = %e, "failed to wait for process");
            SPAWN_FAILED
        }
    }
}

/// Runs `invocation` in the foreground and records its status in `env`.
///
/// A program that could not be started is reported as a [`SpawnError`]; any other
/// status, including non-zero ones, is returned as-is.
pub fn run_foreground(invocation: &Invocation, env: &mut Environment) -> anyhow::Result<ExitCode> {
    let code = execute(invocation, env);
    env.last_status = Some(code);
    if code < 0 {
        return Err(SpawnError {
            program: invocation.program().to_string(),
        }
        .into());
    }
    Ok(code)
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        SPAWN_FAILED
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    SPAWN_FAILED
}

/// Resolve a command path the way a typical shell would.
///
/// - Absolute path: returned if it names a file.
/// - Relative path with several components (`bin/tool`, `./tool`): resolved against
///   `cwd`.
/// - Single component: searched in each directory of `search_paths` (PATH syntax).
/// - Empty path: `None`.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    path: &'a Path,
    cwd: &Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(x), None) if !path.starts_with(".") => {
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => {
            let joined = cwd.join(path);
            find_by_path(&joined)?;
            Some(Cow::Owned(joined))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| find_by_path(candidate).is_some())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.is_file() { Some(path) } else { None }
}
