//! ASGS configuration submission: the defaults document, the flag-to-field
//! table and the overlay that turns command-line options into a request body.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::CommandError;

pub const BUNDLED_DEFAULTS: &str = include_str!("../data/asgs-defaults.json");

const FALLBACK_GRIDNAME: &str = "HSOFS";
const FALLBACK_MET_KIND: &str = "NAM";
const FALLBACK_MACHINE: &str = "Linux";
const FALLBACK_OPERATOR: &str = "ukwn";

/// Meteorological forcing kind; selects the defaults record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetKind {
    Nam,
    Gfs,
    Atcf,
}

impl MetKind {
    pub const ALL: [MetKind; 3] = [MetKind::Nam, MetKind::Gfs, MetKind::Atcf];

    pub fn as_str(self) -> &'static str {
        match self {
            MetKind::Nam => "NAM",
            MetKind::Gfs => "GFS",
            MetKind::Atcf => "ATCF",
        }
    }
}

impl fmt::Display for MetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        MetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == upper)
            .ok_or_else(|| CommandError::UnknownMetKind {
                given: s.to_string(),
                known: MetKind::ALL.iter().map(|k| k.to_string()).collect(),
            })
    }
}

/// Record fields settable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Operator,
    Asgsadmin,
    MetKind,
    Gridname,
    Ncpu,
    Machine,
    Instancename,
    Numwriters,
    Account,
    Queuename,
    Qos,
    Storm,
    Year,
    Waves,
    Varflux,
    Notify,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::Operator,
        Field::Asgsadmin,
        Field::MetKind,
        Field::Gridname,
        Field::Ncpu,
        Field::Machine,
        Field::Instancename,
        Field::Numwriters,
        Field::Account,
        Field::Queuename,
        Field::Qos,
        Field::Storm,
        Field::Year,
        Field::Waves,
        Field::Varflux,
        Field::Notify,
    ];

    pub const REQUIRED: [Field; 5] = [
        Field::Operator,
        Field::Asgsadmin,
        Field::MetKind,
        Field::Gridname,
        Field::Ncpu,
    ];

    /// Command-line spelling, without the leading `--`.
    pub fn flag(self) -> &'static str {
        match self {
            Field::Operator => "operator",
            Field::Asgsadmin => "asgsadmin",
            Field::MetKind => "met_kind",
            Field::Gridname => "gridname",
            Field::Ncpu => "ncpu",
            Field::Machine => "machine",
            Field::Instancename => "instancename",
            Field::Numwriters => "numwriters",
            Field::Account => "account",
            Field::Queuename => "queuename",
            Field::Qos => "qos",
            Field::Storm => "storm",
            Field::Year => "year",
            Field::Waves => "waves",
            Field::Varflux => "varflux",
            Field::Notify => "notify",
        }
    }

    fn slot(self, record: &mut ConfigRecord) -> Slot<'_> {
        match self {
            Field::Operator => Slot::Text(&mut record.operator),
            Field::Asgsadmin => Slot::Text(&mut record.asgsadmin),
            Field::MetKind => Slot::Text(&mut record.met_kind),
            Field::Gridname => Slot::Text(&mut record.gridname),
            Field::Ncpu => Slot::Count(&mut record.ncpu),
            Field::Machine => Slot::Text(&mut record.machine),
            Field::Instancename => Slot::Text(&mut record.instancename),
            Field::Numwriters => Slot::Count(&mut record.numwriters),
            Field::Account => Slot::Text(&mut record.account),
            Field::Queuename => Slot::Text(&mut record.queuename),
            Field::Qos => Slot::Text(&mut record.qos),
            Field::Storm => Slot::Text(&mut record.storm),
            Field::Year => Slot::Count(&mut record.year),
            Field::Waves => Slot::Text(&mut record.waves),
            Field::Varflux => Slot::Text(&mut record.varflux),
            Field::Notify => Slot::Text(&mut record.notify),
        }
    }
}

enum Slot<'a> {
    Text(&'a mut Option<String>),
    Count(&'a mut Option<u32>),
}

/// ASGS configuration record, serialized with uppercase field names.
///
/// Fields the client does not know about are kept in `other` and sent back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "UPPERCASE")]
pub struct ConfigRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instancename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asgsadmin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub met_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gridname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ncpu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numwriters: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queuename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waves: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub varflux: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl ConfigRecord {
    pub fn set(&mut self, field: Field, value: &str) -> Result<(), CommandError> {
        match field.slot(self) {
            Slot::Text(slot) => *slot = Some(value.to_string()),
            Slot::Count(slot) => {
                let n = value
                    .trim()
                    .parse()
                    .map_err(|_| CommandError::InvalidValue {
                        flag: format!("--{}", field.flag()),
                        value: value.to_string(),
                    })?;
                *slot = Some(n);
            }
        }
        Ok(())
    }
}

/// Options given on the command line, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOptions {
    values: BTreeMap<Field, String>,
}

impl ConfigOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn missing_required(&self) -> Vec<String> {
        Field::REQUIRED
            .into_iter()
            .filter(|f| self.get(*f).is_none_or(|v| v.trim().is_empty()))
            .map(|f| format!("--{}", f.flag()))
            .collect()
    }
}

/// Per-forcing default records, one for every [`MetKind`].
#[derive(Debug, Clone)]
pub struct Defaults {
    records: HashMap<MetKind, ConfigRecord>,
}

impl Defaults {
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_DEFAULTS).context("bundled ASGS defaults are invalid")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read defaults document {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("invalid defaults document {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, ConfigRecord> =
            serde_json::from_str(text).context("defaults document is not a JSON object of records")?;

        let mut records = HashMap::new();
        for (key, record) in raw {
            let kind = MetKind::from_str(&key)?;
            if kind.as_str() != key {
                bail!("defaults key '{}' must be uppercase", key);
            }
            records.insert(kind, record);
        }

        let absent: Vec<&str> = MetKind::ALL
            .iter()
            .filter(|k| !records.contains_key(k))
            .map(|k| k.as_str())
            .collect();
        if !absent.is_empty() {
            bail!("defaults document has no record for: {}", absent.join(", "));
        }

        Ok(Self { records })
    }

    pub fn get(&self, kind: MetKind) -> Option<&ConfigRecord> {
        self.records.get(&kind)
    }
}

/// `{gridname}_{met_kind}_{machine}_{operator}` from the supplied options.
pub fn derive_instance_name(opts: &ConfigOptions) -> String {
    let met_kind = opts
        .get(Field::MetKind)
        .map(str::to_uppercase)
        .unwrap_or_else(|| FALLBACK_MET_KIND.to_string());
    format!(
        "{}_{}_{}_{}",
        opts.get(Field::Gridname).unwrap_or(FALLBACK_GRIDNAME),
        met_kind,
        opts.get(Field::Machine).unwrap_or(FALLBACK_MACHINE),
        opts.get(Field::Operator).unwrap_or(FALLBACK_OPERATOR),
    )
}

/// Validates the options and overlays them onto the matching defaults
/// record. Nothing is sent; failures here happen before any request.
pub fn build_payload(
    defaults: &Defaults,
    opts: &ConfigOptions,
) -> Result<ConfigRecord, CommandError> {
    let missing = opts.missing_required();
    if !missing.is_empty() {
        return Err(CommandError::MissingOptions(missing));
    }

    let kind: MetKind = opts.get(Field::MetKind).unwrap_or(FALLBACK_MET_KIND).parse()?;
    let mut record = defaults
        .get(kind)
        .cloned()
        .ok_or_else(|| CommandError::UnknownMetKind {
            given: kind.to_string(),
            known: Vec::new(),
        })?;

    for (field, value) in &opts.values {
        if *field == Field::MetKind {
            record.met_kind = Some(kind.to_string());
        } else {
            record.set(*field, value)?;
        }
    }

    if opts.get(Field::Instancename).is_none() {
        record.instancename = Some(derive_instance_name(opts));
    }

    tracing::debug!(
        met_kind = %kind,
        instancename = record.instancename.as_deref().unwrap_or(""),
        "built ASGS configuration payload"
    );
    Ok(record)
}
