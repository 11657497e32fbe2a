use crate::command::{CommandFactory, ExitCode, Stdin};
use crate::editor::{FdInput, FdTerminal, LineEditor, PromptText};
use crate::env::Environment;
use crate::lexer;
use nix::unistd::{User, getuid};
use std::borrow::Cow;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::process::Stdio;
use tracing::debug;

/// Zero-sized factory for one command type.
///
/// `CommandFactory` is implemented for `Factory<T>` of every built-in and for
/// `Factory<ExternalCommand>`.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Executes command lines against one shell session.
///
/// The interpreter owns the session [`Environment`] and queries its
/// [`CommandFactory`] list in order; the first factory that recognizes the
/// command name wins. See [`Default`] for the factories included out of the box.
///
/// Example
/// ```
/// use line_shell::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.execute_line("export GREETING=hi").unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self::with_env(Environment::new(), commands)
    }

    pub fn with_env(env: Environment, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { env, commands }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run a single command invocation by name with already expanded arguments.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        let stdin = InheritedStdin(std::io::stdin().lock());
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                debug!(name, "dispatching");
                return cmd.execute(Box::new(stdin), Box::new(std::io::stdout()), &mut self.env);
            }
        }
        Err(anyhow::anyhow!("command not found: {}", name))
    }

    /// Tokenizes, expands and runs one line. A blank line does nothing.
    pub fn execute_line(&mut self, line: &str) -> anyhow::Result<ExitCode> {
        let words = lexer::expand_line(line, &self.env);
        let Some((name, args)) = words.split_first() else {
            return Ok(0);
        };
        let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(name, &args_ref)
    }

    /// Reads and runs lines until `exit` or end of input, returning the
    /// session's exit code.
    ///
    /// On a terminal every line goes through the raw-mode [`LineEditor`];
    /// otherwise stdin is read line by line without a prompt.
    pub fn repl(&mut self) -> anyhow::Result<ExitCode> {
        if std::io::stdin().is_terminal() {
            self.repl_interactive()?;
        } else {
            self.repl_batch()?;
        }
        Ok(self.env.exit_code)
    }

    fn repl_interactive(&mut self) -> anyhow::Result<()> {
        let mut editor = LineEditor::new(FdTerminal::stdin());
        let mut input = FdInput::stdin()?;
        while !self.env.should_exit {
            let prompt = session_prompt(&self.env);
            let line = editor.read_line(&prompt, &mut input, io::stdout().lock())?;
            self.execute_reporting(&line);
        }
        Ok(())
    }

    fn repl_batch(&mut self) -> anyhow::Result<()> {
        let mut input = FdInput::stdin()?;
        while !self.env.should_exit {
            let Some(line) = read_unbuffered_line(&mut input)? else {
                break;
            };
            self.execute_reporting(&line);
        }
        Ok(())
    }

    fn execute_reporting(&mut self, line: &str) {
        if let Err(err) = self.execute_line(line) {
            eprintln!("{err:#}");
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `cd`, `pwd`, `export`, `exit`
    /// - external command launcher
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Export>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}

/// Reads one `\n`-terminated line a byte at a time, so the rest of the input
/// is left for commands that share the descriptor. A trailing `\r` is dropped.
/// Returns `None` at end of input.
fn read_unbuffered_line<R: Read>(input: &mut R) -> io::Result<Option<String>> {
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) if bytes.is_empty() => return Ok(None),
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => bytes.push(byte[0]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Builds `>>user@dir==>> `, with `dir` shown as `~` when it is `$HOME`.
pub fn session_prompt(env: &Environment) -> PromptText {
    let user = User::from_uid(getuid())
        .ok()
        .flatten()
        .map(|user| user.name)
        .or_else(|| env.get_var("USER"))
        .unwrap_or_else(|| "?".to_string());
    let at_home = env
        .get_var("HOME")
        .is_some_and(|home| env.current_dir == Path::new(&home));
    let dir = if at_home {
        Cow::Borrowed("~")
    } else {
        env.current_dir.to_string_lossy()
    };
    PromptText::new(format!(">>{user}@{dir}==>> "))
}

struct InheritedStdin<'a>(std::io::StdinLock<'a>);

impl Read for InheritedStdin<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl Stdin for InheritedStdin<'_> {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{Cd, Exit, Export, Pwd, lock_current_dir};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn builtins_only(env: Environment) -> Interpreter {
        Interpreter::with_env(
            env,
            vec![
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Pwd>::default()),
                Box::new(Factory::<Export>::default()),
            ],
        )
    }

    fn isolated_env() -> Environment {
        Environment::with_vars(HashMap::new(), PathBuf::from("/"))
    }

    #[test]
    fn test_batch_lines_leave_rest_of_input_unread() {
        use std::io::Seek;

        let path = std::env::temp_dir().join(format!("line_shell_batch_{}", std::process::id()));
        std::fs::write(&path, "cat\nhello\r\nlast").unwrap();
        let mut input = FdInput::from(std::fs::File::open(&path).unwrap());
        let _ = std::fs::remove_file(&path);

        assert_eq!(read_unbuffered_line(&mut input).unwrap().as_deref(), Some("cat"));
        let mut file = input.into_inner();
        assert_eq!(file.stream_position().unwrap(), 4);

        let mut input = FdInput::from(file);
        assert_eq!(read_unbuffered_line(&mut input).unwrap().as_deref(), Some("hello"));
        assert_eq!(read_unbuffered_line(&mut input).unwrap().as_deref(), Some("last"));
        assert_eq!(read_unbuffered_line(&mut input).unwrap(), None);
    }

    #[test]
    fn test_blank_line_is_noop() {
        let mut sh = builtins_only(isolated_env());
        assert_eq!(sh.execute_line("   \t ").unwrap(), 0);
    }

    #[test]
    fn test_unknown_command_is_error() {
        let mut sh = builtins_only(isolated_env());
        let err = sh.execute_line("frobnicate now").unwrap_err();
        assert_eq!(err.to_string(), "command not found: frobnicate");
    }

    #[test]
    fn test_export_then_expand() {
        let mut sh = builtins_only(isolated_env());
        sh.execute_line("export TARGET=here").unwrap();
        sh.execute_line("export COPY=$TARGET-too").unwrap();
        assert_eq!(sh.env().get_var("COPY").as_deref(), Some("here-too"));
    }

    #[test]
    fn test_negative_exit_status_reaches_exit() {
        let mut sh = builtins_only(isolated_env());
        assert_eq!(sh.execute_line("exit -1").unwrap(), 255);
        assert!(sh.env().should_exit);
    }

    #[test]
    fn test_exit_stops_session() {
        let mut sh = builtins_only(isolated_env());
        assert_eq!(sh.execute_line("exit 2").unwrap(), 2);
        assert!(sh.env().should_exit);
        assert_eq!(sh.env().exit_code, 2);
    }

    #[test]
    fn test_cd_through_line_tracks_previous_dir() {
        let _lock = lock_current_dir();
        let cwd_before = std::env::current_dir().unwrap();
        let base = std::env::temp_dir().join(format!("line_shell_interp_{}", std::process::id()));
        std::fs::create_dir_all(&base).unwrap();
        let base = std::fs::canonicalize(base).unwrap();

        let mut env = isolated_env();
        env.set_var("DEST", base.to_string_lossy());
        let mut sh = builtins_only(env);

        assert_eq!(sh.execute_line("cd $DEST").unwrap(), 0);
        assert_eq!(sh.env().current_dir, base);
        assert_eq!(sh.env().previous_dir, Some(PathBuf::from("/")));

        std::env::set_current_dir(&cwd_before).ok();
        let _ = std::fs::remove_dir_all(base);
    }

    #[test]
    fn test_prompt_shows_tilde_at_home() {
        let mut env = isolated_env();
        env.set_var("HOME", "/");
        let prompt = session_prompt(&env);
        assert!(prompt.text().starts_with(">>"));
        assert!(prompt.text().ends_with("@~==>> "));
        assert_eq!(prompt.visible_len(), prompt.text().chars().count());
    }

    #[test]
    fn test_prompt_shows_full_dir_elsewhere() {
        let mut env = Environment::with_vars(HashMap::new(), PathBuf::from("/usr/lib"));
        env.set_var("HOME", "/home/nobody");
        let prompt = session_prompt(&env);
        assert!(prompt.text().ends_with("@/usr/lib==>> "));
    }
}
