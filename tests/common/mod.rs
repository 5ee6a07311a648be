//! Shared helpers for the HTTP-level tests.

use adcirclive::cli::{Cli, Session};
use adcirclive::{Client, Credentials, Settings};
use clap::Parser;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

pub const API_KEY: &str = "test-key";
pub const API_SECRET: &str = "test-secret";

/// Output of one CLI invocation.
pub struct Run {
    pub result: anyhow::Result<()>,
    pub stdout: String,
    pub stderr: String,
}

#[allow(dead_code)]
pub fn client_for(url: &str) -> Client {
    let settings = Settings {
        url: url.to_string(),
        credentials: Credentials::new(API_KEY, API_SECRET),
        timeout: None,
    };
    Client::new(&settings).unwrap().with_progress(false)
}

/// Writes an `asgs-global.conf` pointing at `url`.
pub fn write_conf(url: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "[adcirclive]\napikey = {API_KEY}\napisecret = {API_SECRET}\nurl = {url}\n"
    )
    .unwrap();
    file
}

/// Runs the CLI synchronously. Call from `spawn_blocking`: the blocking
/// HTTP client must not run on an async worker.
pub fn run_cli(url: &str, args: &[&str]) -> Run {
    let conf = write_conf(url);
    let conf_path = conf.path().to_string_lossy().into_owned();

    let mut argv = vec![
        "adcirclive",
        "--quiet",
        "--config",
        conf_path.as_str(),
        "--url",
        url,
    ];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();

    let (mut out, mut err) = (Vec::new(), Vec::new());
    let result = {
        let mut session = Session::new(&mut out, &mut err, cli.global.overrides(), true);
        cli.run(&mut session).map(|_| ())
    };

    Run {
        result,
        stdout: String::from_utf8(out).unwrap(),
        stderr: String::from_utf8(err).unwrap(),
    }
}

/// In-memory log sink for a scoped tracing subscriber.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Like [`run_cli`], also returning the `warn`-and-above events it logged.
#[allow(dead_code)]
pub fn run_cli_logged(url: &str, args: &[&str]) -> (Run, String) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let run = tracing::subscriber::with_default(subscriber, || run_cli(url, args));
    (run, logs.contents())
}
