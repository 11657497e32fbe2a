use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd".
    fn name() -> &'static str;

    /// Whether every argument is positional, so that `-` reaches the command
    /// instead of being read as a flag.
    fn positionals_only() -> bool {
        false
    }

    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        mut stdin: Box<dyn Stdin>,
        mut stdout: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match T::execute(*self, &mut stdin, &mut stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{e:#}")?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _stdin: Box<dyn Stdin>,
        mut stdout: Box<dyn Stdout>,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        stdout.write_all(self.output.as_bytes())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        let parsed = if T::positionals_only() {
            let mut guarded = Vec::with_capacity(args.len() + 1);
            guarded.push("--");
            guarded.extend_from_slice(args);
            T::from_args(&[name], &guarded)
        } else {
            T::from_args(&[name], args)
        };
        Some(match parsed {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// `~` and no target mean $HOME, `-` means the previous directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; may start with `~/`.
    pub target: Option<String>,
}

impl Cd {
    fn resolve(&self, env: &Environment) -> Result<PathBuf> {
        let home = || {
            env.get_var("HOME")
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("cd: HOME not set"))
        };
        let target = match self.target.as_deref() {
            None | Some("") | Some("~") => home()?,
            Some("-") => env
                .previous_dir
                .clone()
                .ok_or_else(|| anyhow!("cd: no previous directory"))?,
            Some(t) => match t.strip_prefix("~/") {
                Some(rest) => home()?.join(rest),
                None => PathBuf::from(t),
            },
        };
        Ok(if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        })
    }
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn positionals_only() -> bool {
        true
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let new_dir = self.resolve(env)?;
        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        let left = std::mem::replace(&mut env.current_dir, canonical);
        env.previous_dir = Some(left);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Set a shell variable that is passed to every command started afterwards.
pub struct Export {
    #[argh(positional)]
    /// assignment in the form VAR=value.
    pub assignment: Option<String>,
}

impl BuiltinCommand for Export {
    fn name() -> &'static str {
        "export"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let Some(assignment) = self.assignment else {
            return Ok(0);
        };
        match assignment.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                env.set_var(name, value);
                Ok(0)
            }
            _ => {
                writeln!(stdout, "Usage: export VAR=value")?;
                Ok(1)
            }
        }
    }
}

#[derive(FromArgs)]
/// Leave the shell.
/// The status is reduced modulo 256 like a POSIX shell does, so `exit -1` is 255.
pub struct Exit {
    #[argh(positional)]
    /// exit status, 0 when omitted; taken modulo 256.
    pub code: Option<ExitCode>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn positionals_only() -> bool {
        true
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let code = self.code.unwrap_or(0).rem_euclid(256);
        env.request_exit(code);
        Ok(code)
    }
}

#[cfg(test)]
pub(crate) fn lock_current_dir() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::io::Cursor;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = stdenv::temp_dir().join(format!("line_shell_{}_{tag}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("inner")).unwrap();
        fs::canonicalize(dir).unwrap()
    }

    fn env_in(dir: &PathBuf) -> Environment {
        let mut vars = HashMap::new();
        vars.insert("HOME".to_string(), dir.to_string_lossy().into_owned());
        Environment::with_vars(vars, dir.clone())
    }

    fn cd(target: Option<&str>, env: &mut Environment) -> Result<ExitCode> {
        let cmd = Cd {
            target: target.map(String::from),
        };
        cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), env)
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let mut env = Environment::with_vars(HashMap::new(), PathBuf::from("/some/where"));
        let mut out = Vec::new();
        let res = Pwd {}.execute(&mut Cursor::new(Vec::new()), &mut out, &mut env);

        assert_eq!(res.unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "/some/where\n");
    }

    #[test]
    fn test_cd_relative_then_dash_returns() {
        let _lock = lock_current_dir();
        let cwd_before = stdenv::current_dir().unwrap();
        let base = scratch_dir("dash");
        let mut env = env_in(&base);

        assert_eq!(cd(Some("inner"), &mut env).unwrap(), 0);
        assert_eq!(env.current_dir, base.join("inner"));
        assert_eq!(env.previous_dir, Some(base.clone()));

        assert_eq!(cd(Some("-"), &mut env).unwrap(), 0);
        assert_eq!(env.current_dir, base);
        assert_eq!(env.previous_dir, Some(base.join("inner")));

        stdenv::set_current_dir(&cwd_before).ok();
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn test_cd_home_forms() {
        let _lock = lock_current_dir();
        let cwd_before = stdenv::current_dir().unwrap();
        let base = scratch_dir("home");
        let mut env = env_in(&base);
        env.current_dir = base.join("inner");

        cd(None, &mut env).unwrap();
        assert_eq!(env.current_dir, base);

        cd(Some("~/inner"), &mut env).unwrap();
        assert_eq!(env.current_dir, base.join("inner"));

        cd(Some("~"), &mut env).unwrap();
        assert_eq!(env.current_dir, base);

        stdenv::set_current_dir(&cwd_before).ok();
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn test_cd_dash_without_previous_fails() {
        let mut env = Environment::with_vars(HashMap::new(), PathBuf::from("/"));
        let err = cd(Some("-"), &mut env).unwrap_err();
        assert_eq!(err.to_string(), "cd: no previous directory");
        assert_eq!(env.current_dir, PathBuf::from("/"));
    }

    #[test]
    fn test_cd_missing_dir_keeps_state() {
        let _lock = lock_current_dir();
        let base = scratch_dir("missing");
        let mut env = env_in(&base);

        assert!(cd(Some("does_not_exist"), &mut env).is_err());
        assert_eq!(env.current_dir, base);
        assert!(env.previous_dir.is_none());
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn test_cd_dash_is_parsed_as_target() {
        let parsed = Cd::from_args(&["cd"], &["--", "-"]).ok().unwrap();
        assert_eq!(parsed.target.as_deref(), Some("-"));

        let env = Environment::with_vars(HashMap::new(), PathBuf::from("/"));
        let factory = Factory::<Cd>::default();
        assert!(factory.try_create(&env, "cd", &["-"]).is_some());
        assert!(factory.try_create(&env, "pwd", &[]).is_none());
    }

    #[test]
    fn test_export_sets_variable() {
        let mut env = Environment::with_vars(HashMap::new(), PathBuf::from("/"));
        let cmd = Export {
            assignment: Some("GREETING=hello=world".to_string()),
        };
        let code = cmd
            .execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut env)
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(env.get_var("GREETING").as_deref(), Some("hello=world"));
    }

    #[test]
    fn test_export_without_assignment_prints_usage() {
        let mut env = Environment::with_vars(HashMap::new(), PathBuf::from("/"));
        let mut out = Vec::new();
        let cmd = Export {
            assignment: Some("NOPE".to_string()),
        };
        let code = cmd
            .execute(&mut Cursor::new(Vec::new()), &mut out, &mut env)
            .unwrap();

        assert_eq!(code, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "Usage: export VAR=value\n");
        assert!(env.vars.is_empty());
    }

    #[test]
    fn test_exit_status_wraps_into_byte_range() {
        let parsed = Exit::from_args(&["exit"], &["--", "-1"]).ok().unwrap();
        assert_eq!(parsed.code, Some(-1));

        for (given, expected) in [(-1, 255), (300, 44), (256, 0), (255, 255)] {
            let mut env = Environment::with_vars(HashMap::new(), PathBuf::from("/"));
            let code = Exit { code: Some(given) }
                .execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut env)
                .unwrap();
            assert_eq!(code, expected, "exit {given}");
            assert_eq!(env.exit_code, expected);
        }
    }

    #[test]
    fn test_exit_requests_stop() {
        let mut env = Environment::with_vars(HashMap::new(), PathBuf::from("/"));
        let cmd = Exit { code: Some(4) };
        let code = cmd
            .execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut env)
            .unwrap();

        assert_eq!(code, 4);
        assert!(env.should_exit);
        assert_eq!(env.exit_code, 4);
    }
}
