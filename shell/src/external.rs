use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tracing::debug;

/// A program found on disk, run as a child process.
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(program: PathBuf, args: Vec<OsString>) -> Self {
        Self { program, args }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let program = find_command_path(OsStr::new(&search_paths), &env.current_dir, name)?;
        Some(Box::new(ExternalCommand::new(
            program,
            args.iter().map(OsString::from).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        debug!(program = %self.program.display(), args = self.args.len(), "spawning");
        let mut child = std::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(stdin.stdio())
            .stdout(stdout.stdio())
            .envs(env.vars.iter())
            .current_dir(&env.current_dir)
            .spawn()
            .with_context(|| format!("cannot execute {}", self.program.display()))?;
        let status = child.wait()?;
        let code = status.code().unwrap_or_else(|| terminated_by_signal(status));
        debug!(code, "child exited");
        Ok(code)
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match exit_status.signal() {
        Some(signal) => 128 + signal,
        None => -1,
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command name the way `execvp` does.
///
/// - A name containing a path separator is used as given, relative names
///   against `current_dir`; no PATH search happens.
/// - A bare name is looked up in each directory of `search_paths`, first
///   executable regular file wins.
/// - An empty name resolves to nothing.
pub fn find_command_path(search_paths: &OsStr, current_dir: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let path = current_dir.join(name);
        return is_executable(&path).then_some(path);
    }
    std::env::split_paths(search_paths)
        .map(|dir| current_dir.join(dir).join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
