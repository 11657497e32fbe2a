use crate::command::ExitCode;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// State of one shell session, owned by the interpreter.
///
/// Passed explicitly to every command, so `cd -` and `export` need no
/// process-wide state beyond the real working directory.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variables seen by `$NAME` expansion and added to every child's environment.
    pub vars: HashMap<String, String>,
    /// Working directory for command execution and the prompt.
    pub current_dir: PathBuf,
    /// Directory left by the last successful `cd`; `None` until then.
    pub previous_dir: Option<PathBuf>,
    /// Set by `exit`; the read loop stops before the next prompt.
    pub should_exit: bool,
    /// Status the shell process ends with once `should_exit` is set.
    pub exit_code: ExitCode,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_vars(vars, current_dir)
    }

    /// Builds a session from explicit variables and directory, without touching
    /// the process state. No previous directory, no exit requested.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: PathBuf) -> Self {
        Self {
            vars,
            current_dir,
            previous_dir: None,
            should_exit: false,
            exit_code: 0,
        }
    }

    /// Get the value of a variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override a variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Requests the session to end with `code`.
    pub fn request_exit(&mut self, code: ExitCode) {
        self.should_exit = true;
        self.exit_code = code;
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
