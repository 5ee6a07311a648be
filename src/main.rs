use anyhow::{Context, Result, anyhow};
use std::io;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use adcirclive::cli::{Cli, Parsed, Session};

fn main() -> Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut err = io::stderr();

    let cli = match Cli::parse_args(std::env::args_os(), &mut out, &mut err)? {
        Parsed::Run(cli) => cli,
        Parsed::Exit(code) => return Ok(code),
    };
    init_tracing(cli.global.log_level.as_deref())?;
    debug!(command = ?cli.command, "starting adcirclive");

    let mut session = Session::new(&mut out, &mut err, cli.global.overrides(), cli.global.quiet);
    cli.run(&mut session)
}

fn init_tracing(log_level: Option<&str>) -> Result<()> {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid log level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}
