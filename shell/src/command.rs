use crate::env::Environment;
use anyhow::Result;
use std::io::{Read, Write};
use std::process::Stdio;

/// Status a command hands back to the interpreter.
///
/// 0 means success and anything else failure, as in POSIX shells. Processes
/// killed by a signal are reported as `128 + signal`; `exit` keeps the value
/// in `0..=255`.
pub type ExitCode = i32;

/// Input side of a command invocation.
///
/// Built-ins read from it in-process; an external command turns it into the
/// child's fd 0 through [`Stdin::stdio`]. A blanket implementation covers every
/// type that is both `Read` and `Into<Stdio>`, such as `File`.
pub trait Stdin: Read {
    /// Converts the stream into the handle passed to `std::process::Command::stdin`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Read + Into<Stdio>> Stdin for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// Output side of a command invocation.
///
/// Built-ins write their results and error messages to it; an external command
/// gets it as fd 1. Covered by a blanket implementation for `Write + Into<Stdio>`
/// types such as `std::io::Stdout` and `File`.
pub trait Stdout: Write {
    /// Converts the stream into the handle passed to `std::process::Command::stdout`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// A fully parsed command ready to run once.
///
/// Built-ins get this through a blanket impl over their `argh` structs;
/// programs found on `PATH` implement it by spawning a child.
pub trait ExecutableCommand {
    /// Runs the command against the session environment. `cd`, `export` and
    /// `exit` change `env`; external programs only read it.
    fn execute(
        self: Box<Self>,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// Builds a command from a name and its already expanded arguments.
///
/// The interpreter asks its factories in order and runs the first command it
/// gets, so built-in factories come before the PATH lookup.
pub trait CommandFactory {
    /// Returns `None` when the factory doesn't recognize `name`; lookups may
    /// consult `env`, e.g. its `PATH` and current directory.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
