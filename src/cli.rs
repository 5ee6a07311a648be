//! Command-line surface: one subcommand per API operation, each handler
//! behind the same [`Execute`] contract.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::asgs::{ConfigOptions, Defaults, Field, build_payload};
use crate::client::{ASGS_CONFIG_PATH, ApiResponse, Client, MESHES_PATH};
use crate::config::{Overrides, load_settings};
use crate::error::CommandError;
use crate::mesh::{self, Mesh};
use crate::xdmf::{OutputSelection, TimeBlock, XdmfKind, XdmfRequest};

#[derive(Parser, Debug)]
#[command(
    name = "adcirclive",
    version,
    about = "Client for the ADCIRC Live tools API",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// INI file holding `apikey`/`apisecret` under `[adcirclive]`
    /// (default: $HOME/asgs-global.conf).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config_path: Option<PathBuf>,
    /// Base URL of the API.
    #[arg(long, value_name = "URL", global = true)]
    pub url: Option<String>,
    /// Request timeout; requests wait indefinitely when unset.
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,
    /// Do not show a spinner while waiting for the service.
    #[arg(long, short, global = true)]
    pub quiet: bool,
    /// Tracing filter, e.g. `debug` or `adcirclive=trace` (default: $RUST_LOG or `warn`).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,
}

impl GlobalArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config_path.clone(),
            url: self.url.clone(),
            timeout: self.timeout.map(Duration::from_secs),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit an ASGS configuration built from the met_kind defaults.
    Config(ConfigArgs),
    /// Print this usage text.
    Help,
    /// List the meshes known to the service.
    Meshes(MeshesArgs),
    /// Print a new random UUID.
    Uuid,
    /// Generate a static XDMF description for a mesh.
    Xdmf(XdmfArgs),
    /// Generate a time-varying XDMF description for a mesh.
    Xdmftv(XdmfTvArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (the `content` field, or a table).
    Stdout,
    /// The service's JSON reply, unmodified.
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(long)]
    pub operator: Option<String>,
    #[arg(long)]
    pub asgsadmin: Option<String>,
    #[arg(long = "met_kind", default_value = "NAM")]
    pub met_kind: String,
    #[arg(long)]
    pub gridname: Option<String>,
    #[arg(long)]
    pub ncpu: Option<String>,
    #[arg(long)]
    pub machine: Option<String>,
    #[arg(long)]
    pub instancename: Option<String>,
    #[arg(long)]
    pub numwriters: Option<String>,
    #[arg(long)]
    pub account: Option<String>,
    #[arg(long)]
    pub queuename: Option<String>,
    #[arg(long)]
    pub qos: Option<String>,
    #[arg(long)]
    pub storm: Option<String>,
    #[arg(long)]
    pub year: Option<String>,
    #[arg(long)]
    pub waves: Option<String>,
    #[arg(long)]
    pub varflux: Option<String>,
    #[arg(long)]
    pub notify: Option<String>,
    /// Defaults document to use instead of the bundled one.
    #[arg(long, value_name = "PATH")]
    pub defaults: Option<PathBuf>,
    #[arg(long = "as", value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl ConfigArgs {
    pub fn options(&self) -> ConfigOptions {
        let supplied = [
            (Field::Operator, self.operator.as_ref()),
            (Field::Asgsadmin, self.asgsadmin.as_ref()),
            (Field::MetKind, Some(&self.met_kind)),
            (Field::Gridname, self.gridname.as_ref()),
            (Field::Ncpu, self.ncpu.as_ref()),
            (Field::Machine, self.machine.as_ref()),
            (Field::Instancename, self.instancename.as_ref()),
            (Field::Numwriters, self.numwriters.as_ref()),
            (Field::Account, self.account.as_ref()),
            (Field::Queuename, self.queuename.as_ref()),
            (Field::Qos, self.qos.as_ref()),
            (Field::Storm, self.storm.as_ref()),
            (Field::Year, self.year.as_ref()),
            (Field::Waves, self.waves.as_ref()),
            (Field::Varflux, self.varflux.as_ref()),
            (Field::Notify, self.notify.as_ref()),
        ];

        let mut opts = ConfigOptions::new();
        for (field, value) in supplied {
            if let Some(value) = value {
                opts.insert(field, value.clone());
            }
        }
        opts
    }
}

#[derive(Args, Debug, Clone)]
pub struct MeshesArgs {
    #[arg(long = "as", value_enum, default_value_t = OutputFormat::Stdout)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Water surface elevation time series.
    #[arg(long)]
    pub fort63: bool,
    /// Depth-averaged velocity time series.
    #[arg(long)]
    pub fort64: bool,
    /// Atmospheric pressure time series.
    #[arg(long)]
    pub fort73: bool,
    /// Wind velocity time series.
    #[arg(long)]
    pub fort74: bool,
    #[arg(long)]
    pub maxele: bool,
    #[arg(long)]
    pub maxvel: bool,
    #[arg(long)]
    pub maxwvel: bool,
    #[arg(long)]
    pub minpr: bool,
    #[arg(long = "swan-hs")]
    pub swan_hs: bool,
    #[arg(long = "swan-tps")]
    pub swan_tps: bool,
    #[arg(long = "swan-dir")]
    pub swan_dir: bool,
    #[arg(long = "swan-hs-max")]
    pub swan_hs_max: bool,
    #[arg(long = "swan-tps-max")]
    pub swan_tps_max: bool,
}

impl OutputArgs {
    pub fn selection(&self) -> OutputSelection {
        OutputSelection {
            fort63: self.fort63,
            fort64: self.fort64,
            fort73: self.fort73,
            fort74: self.fort74,
            maxele: self.maxele,
            maxvel: self.maxvel,
            maxwvel: self.maxwvel,
            minpr: self.minpr,
            swan_hs: self.swan_hs,
            swan_tps: self.swan_tps,
            swan_dir: self.swan_dir,
            swan_hs_max: self.swan_hs_max,
            swan_tps_max: self.swan_tps_max,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct XdmfArgs {
    /// Mesh name as listed by `meshes`.
    #[arg(long, default_value = "HSOFS")]
    pub mesh: String,
    #[command(flatten)]
    pub output: OutputArgs,
    #[arg(long = "paraview-version", default_value = "5.11")]
    pub paraview_version: String,
    #[arg(long = "adcirc-version", default_value = "55")]
    pub adcirc_version: String,
    #[arg(long = "as", value_enum, default_value_t = OutputFormat::Stdout)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct XdmfTvArgs {
    #[command(flatten)]
    pub xdmf: XdmfArgs,
    #[arg(long = "cold-start-date-time", value_name = "DATETIME")]
    pub cold_start_date_time: Option<String>,
    #[arg(long = "output-start-date-time", value_name = "DATETIME")]
    pub output_start_date_time: Option<String>,
    #[arg(long = "num-data-sets", value_name = "N")]
    pub num_data_sets: Option<u32>,
    /// Seconds between data sets.
    #[arg(long = "time-increment", value_name = "SECS")]
    pub time_increment: Option<u64>,
}

impl XdmfTvArgs {
    pub fn time(&self) -> TimeBlock {
        TimeBlock {
            cold_start_date_time: self.cold_start_date_time.clone(),
            output_start_date_time: self.output_start_date_time.clone(),
            num_data_sets: self.num_data_sets,
            time_increment: self.time_increment,
        }
    }
}

/// Per-invocation state shared by the handlers.
///
/// The signed client is created on first use, so commands that never touch
/// the network never need credentials.
pub struct Session<'a> {
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
    overrides: Overrides,
    quiet: bool,
    client: Option<Client>,
}

impl<'a> Session<'a> {
    pub fn new(
        out: &'a mut dyn Write,
        err: &'a mut dyn Write,
        overrides: Overrides,
        quiet: bool,
    ) -> Self {
        Self {
            out,
            err,
            overrides,
            quiet,
            client: None,
        }
    }

    pub fn with_client(out: &'a mut dyn Write, err: &'a mut dyn Write, client: Client) -> Self {
        Self {
            out,
            err,
            overrides: Overrides::default(),
            quiet: true,
            client: Some(client),
        }
    }

    pub fn client(&mut self) -> Result<&Client> {
        let client = match self.client.take() {
            Some(client) => client,
            None => {
                let settings = load_settings(&self.overrides)?;
                let client = Client::new(&settings)?.with_progress(!self.quiet);
                info!(url = client.base_url(), "using API");
                client
            }
        };
        Ok(&*self.client.insert(client))
    }
}

/// Common handler contract: run once, report an exit code.
pub trait Execute {
    fn execute(&self, session: &mut Session<'_>) -> Result<ExitCode>;
}

/// Outcome of [`Cli::parse_args`].
pub enum Parsed {
    Run(Cli),
    /// Clap already printed help, version or a usage error.
    Exit(ExitCode),
}

impl Cli {
    /// Parses `args` without touching the process streams.
    ///
    /// Help and usage errors are written to `err` (help exits 0, usage
    /// errors with clap's code); `--version` goes to `out`.
    pub fn parse_args<I, T>(args: I, out: &mut dyn Write, err: &mut dyn Write) -> Result<Parsed>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let error = match Cli::try_parse_from(args) {
            Ok(cli) => return Ok(Parsed::Run(cli)),
            Err(error) => error,
        };
        let code = match error.kind() {
            ErrorKind::DisplayHelp => {
                write!(err, "{}", error.render())?;
                ExitCode::SUCCESS
            }
            ErrorKind::DisplayVersion => {
                write!(out, "{}", error.render())?;
                ExitCode::SUCCESS
            }
            _ => {
                write!(err, "{}", error.render())?;
                ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(2))
            }
        };
        Ok(Parsed::Exit(code))
    }

    pub fn run(&self, session: &mut Session<'_>) -> Result<ExitCode> {
        match &self.command {
            Some(command) => command.execute(session),
            None => Command::Help.execute(session),
        }
    }
}

impl Execute for Command {
    fn execute(&self, session: &mut Session<'_>) -> Result<ExitCode> {
        match self {
            Command::Config(args) => args.execute(session),
            Command::Help => print_help(session),
            Command::Meshes(args) => args.execute(session),
            Command::Uuid => {
                writeln!(session.out, "{}", uuid::Uuid::new_v4())?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Xdmf(args) => args.execute(session),
            Command::Xdmftv(args) => args.execute(session),
        }
    }
}

fn print_help(session: &mut Session<'_>) -> Result<ExitCode> {
    let help = Cli::command().render_long_help();
    write!(session.err, "{}", help)?;
    Ok(ExitCode::SUCCESS)
}

impl Execute for ConfigArgs {
    fn execute(&self, session: &mut Session<'_>) -> Result<ExitCode> {
        let defaults = match &self.defaults {
            Some(path) => Defaults::load(path)?,
            None => Defaults::bundled()?,
        };
        let payload = build_payload(&defaults, &self.options())?;

        let resp = session.client()?.post_json(ASGS_CONFIG_PATH, &payload)?;
        if skip_failed(&resp) {
            return Ok(ExitCode::SUCCESS);
        }
        print_reply(session, &resp, self.format)?;
        Ok(ExitCode::SUCCESS)
    }
}

impl Execute for MeshesArgs {
    fn execute(&self, session: &mut Session<'_>) -> Result<ExitCode> {
        let resp = session.client()?.get(MESHES_PATH)?;
        if skip_failed(&resp) {
            return Ok(ExitCode::SUCCESS);
        }
        match self.format {
            OutputFormat::Json => write_raw(session, &resp)?,
            OutputFormat::Stdout => {
                let meshes: Vec<Mesh> = resp.json()?;
                write!(session.out, "{}", mesh::render_table(&meshes))?;
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}

impl Execute for XdmfArgs {
    fn execute(&self, session: &mut Session<'_>) -> Result<ExitCode> {
        self.run(session, XdmfKind::Static, None)
    }
}

impl Execute for XdmfTvArgs {
    fn execute(&self, session: &mut Session<'_>) -> Result<ExitCode> {
        self.xdmf.run(session, XdmfKind::TimeVarying, Some(self.time()))
    }
}

impl XdmfArgs {
    fn run(
        &self,
        session: &mut Session<'_>,
        kind: XdmfKind,
        time: Option<TimeBlock>,
    ) -> Result<ExitCode> {
        let catalog = session.client()?.get(MESHES_PATH)?;
        if skip_failed(&catalog) {
            return Ok(ExitCode::SUCCESS);
        }
        let meshes: Vec<Mesh> = catalog.json()?;
        let mesh = mesh::find(&meshes, &self.mesh)
            .cloned()
            .ok_or_else(|| CommandError::MeshNotFound(self.mesh.clone()))?;

        let request = XdmfRequest {
            mesh,
            output: self.output.selection(),
            paraview_version: self.paraview_version.clone(),
            adcirc_version: self.adcirc_version.clone(),
            time,
        };
        let resp = session.client()?.post_json(kind.path(), &request)?;
        if skip_failed(&resp) {
            return Ok(ExitCode::SUCCESS);
        }
        print_reply(session, &resp, self.format)?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Logs a failed reply and reports whether the handler should stop.
/// Failed replies print nothing on stdout and do not change the exit code.
fn skip_failed(resp: &ApiResponse) -> bool {
    match resp.failure() {
        Some(message) => {
            warn!(status = %resp.status, url = %resp.url, "{}", message);
            true
        }
        None => false,
    }
}

fn print_reply(session: &mut Session<'_>, resp: &ApiResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => write_raw(session, resp),
        OutputFormat::Stdout => {
            let content = resp.content()?;
            write_line(session, &content)
        }
    }
}

fn write_raw(session: &mut Session<'_>, resp: &ApiResponse) -> Result<()> {
    write_line(session, &resp.body)
}

fn write_line(session: &mut Session<'_>, text: &str) -> Result<()> {
    session
        .out
        .write_all(text.as_bytes())
        .context("failed to write output")?;
    if !text.ends_with('\n') {
        session.out.write_all(b"\n")?;
    }
    Ok(())
}
