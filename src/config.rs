use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::signer::Credentials;

pub const DEFAULT_URL: &str = "https://tools.adcirc.live";
pub const CONFIG_SECTION: &str = "adcirclive";
pub const CONFIG_FILE_NAME: &str = "asgs-global.conf";

/// Resolved connection settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base API URL, normally [`DEFAULT_URL`].
    pub url: String,
    pub credentials: Credentials,
    /// Request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Values given on the command line; each wins over env and file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub url: Option<String>,
    pub timeout: Option<Duration>,
}

pub fn load_settings(overrides: &Overrides) -> Result<Settings> {
    load_settings_with(overrides, |name| std::env::var(name).ok())
}

pub(crate) fn load_settings_with(
    overrides: &Overrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut url = overrides.url.clone().or_else(|| env("ADCIRCLIVE_URL"));
    let mut api_key = env("ADCIRCLIVE_API_KEY");
    let mut api_secret = env("ADCIRCLIVE_API_SECRET");

    let path = overrides
        .config_path
        .clone()
        .or_else(|| env("ADCIRCLIVE_CONF").map(PathBuf::from))
        .or_else(default_config_path);

    if url.is_none() || api_key.is_none() || api_secret.is_none() {
        if let Some(path) = path.as_deref().filter(|p| p.exists()) {
            let ini = read_ini(path)
                .with_context(|| format!("failed to read configuration file {}", path.display()))?;
            if let Some(section) = ini.get(CONFIG_SECTION) {
                tracing::debug!(path = %path.display(), "loaded configuration file");
                url = url.or_else(|| section.get("url").cloned());
                api_key = api_key.or_else(|| section.get("apikey").cloned());
                api_secret = api_secret.or_else(|| section.get("apisecret").cloned());
            }
        }
    }

    let location = match &path {
        Some(p) => p.display().to_string(),
        None => format!("$HOME/{CONFIG_FILE_NAME}"),
    };
    let Some(api_key) = api_key.filter(|v| !v.is_empty()) else {
        bail!(
            "Missing configuration: apikey (set ADCIRCLIVE_API_KEY or put `apikey` under [{}] in {})",
            CONFIG_SECTION,
            location
        );
    };
    let Some(api_secret) = api_secret.filter(|v| !v.is_empty()) else {
        bail!(
            "Missing configuration: apisecret (set ADCIRCLIVE_API_SECRET or put `apisecret` under [{}] in {})",
            CONFIG_SECTION,
            location
        );
    };

    Ok(Settings {
        url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        credentials: Credentials::new(api_key, api_secret),
        timeout: overrides.timeout,
    })
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

pub(crate) type IniSections = HashMap<String, HashMap<String, String>>;

fn read_ini(path: &Path) -> Result<IniSections> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_ini(&text))
}

/// Minimal INI reader: `[section]` headers, `key = value` or `key: value`,
/// `#`/`;` comment lines. Keys outside any section land under `""`.
pub(crate) fn parse_ini(text: &str) -> IniSections {
    let mut sections = IniSections::new();
    let mut current = String::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = name.trim().to_lowercase();
            sections.entry(current.clone()).or_default();
            continue;
        }

        let split = match (line.find('='), line.find(':')) {
            (Some(e), Some(c)) => Some(e.min(c)),
            (e, c) => e.or(c),
        };
        if let Some(idx) = split {
            let key = line[..idx].trim().to_lowercase();
            let value = strip_quotes(&line[idx + 1..]);
            sections
                .entry(current.clone())
                .or_default()
                .insert(key, value.to_string());
        }
    }

    sections
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
