use crate::command::ExitCode;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Mutable state of one interactive session.
///
/// The environment contains:
/// - `vars`: environment variables visible to executed programs.
/// - `current_dir`: the working directory programs are started in.
/// - `last_status`: exit status of the most recent foreground command.
/// - `should_exit`: set by the `exit` command; the loop stops once it sees it.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub last_status: Option<ExitCode>,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state: variables from `std::env::vars()` and the
    /// working directory from `std::env::current_dir()`.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            last_status: None,
            should_exit: false,
        }
    }

    /// Get the value of a variable, falling back to the process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override a variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Working directory accessor used by the prompt and by external commands.
    pub fn work_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_var("HOME")
            .or_else(|| self.get_var("USERPROFILE"))
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::path::PathBuf;

    fn empty_env() -> Environment {
        Environment {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap(),
            last_status: None,
            should_exit: false,
        }
    }

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = empty_env();

        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert!(!env.should_exit);
        assert_eq!(env.last_status, None);
    }

    #[test]
    fn test_home_dir_prefers_session_var() {
        let mut env = empty_env();
        env.set_var("HOME", "/home/someone");
        assert_eq!(env.home_dir(), Some(PathBuf::from("/home/someone")));
    }
}
