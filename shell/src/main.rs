use argh::FromArgs;
use line_shell::Interpreter;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "LINE_SHELL_LOG";

#[derive(FromArgs)]
/// Interactive command shell with in-place line editing.
struct Cli {
    /// run a single command line and exit with its status
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// tracing filter directives, overriding $LINE_SHELL_LOG
    #[argh(option)]
    log: Option<String>,
}

fn init_tracing(directives: Option<&str>) {
    let filter = match directives {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .compact()
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli: Cli = argh::from_env();
    init_tracing(cli.log.as_deref());

    let mut shell = Interpreter::default();
    let code = match cli.command {
        Some(line) => shell.execute_line(&line)?,
        None => shell.repl()?,
    };
    std::process::exit(code)
}
