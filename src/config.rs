use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ConfigError;

/// Session protocol of a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ftp,
    Sftp,
}

impl Mode {
    /// Port used when a section does not set one
    pub fn default_port(self) -> u16 {
        match self {
            Mode::Ftp => 21,
            Mode::Sftp => 22,
        }
    }
}

/// One remote ingestion host, parsed from a configuration section
#[derive(Debug, Clone)]
pub struct Destination {
    /// Section name, used in logs and audit output
    pub label: String,
    pub mode: Mode,
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Never logged; `Debug` output is redacted
    pub password: SecretString,
    /// Remote directory uploads land in
    pub outdir: String,
    /// Customer identifiers this host accepts
    pub customers: Vec<String>,
}

/// Keys of one section, as read from the file (ini key `passwd` etc.)
#[derive(Deserialize)]
struct RawSection {
    mode: String,
    user: String,
    passwd: SecretString,
    host: String,
    outdir: String,
    customer: String,
    port: Option<String>,
}

/// Parses a staging directory's configuration file into destinations
///
/// # Arguments
/// * `path` - Path to the `.config.ini` file
///
/// # Returns
/// Destinations in the order their sections appear in the file
///
/// # Errors
/// - File not found or unreadable
/// - Malformed line, key outside a section, duplicate section
/// - Missing required key (`mode`, `user`, `passwd`, `host`, `outdir`, `customer`)
/// - Unknown mode or invalid port
///
/// # File Format
/// ```text
/// [yms-primary]
/// mode = FTP
/// user = loader
/// passwd = secret
/// host = 10.0.0.5
/// outdir = incoming/tds
/// customer = ACME, GLOBEX
/// ```
pub fn parse_destinations(path: &Path) -> Result<Vec<Destination>, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut sections: Vec<(String, Map<String, Value>)> = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let syntax = |reason: String| ConfigError::Syntax {
            path: path.to_path_buf(),
            line: line_num + 1,
            reason,
        };

        if let Some(header) = line.strip_prefix('[') {
            let name = header
                .strip_suffix(']')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| syntax(format!("malformed section header {:?}", line)))?;
            if sections.iter().any(|(existing, _)| existing == name) {
                return Err(syntax(format!("duplicate section [{}]", name)));
            }
            sections.push((name.to_string(), Map::new()));
            continue;
        }

        let (key, value) = line
            .split_once(['=', ':'])
            .ok_or_else(|| syntax(format!("expected `key = value`, got {:?}", line)))?;
        let (_, keys) = sections
            .last_mut()
            .ok_or_else(|| syntax(format!("key {:?} outside of any section", key.trim())))?;
        keys.insert(
            key.trim().to_ascii_lowercase(),
            Value::String(value.trim().to_string()),
        );
    }

    sections
        .into_iter()
        .map(|(label, keys)| to_destination(path, label, keys))
        .collect()
}

fn to_destination(
    path: &Path,
    label: String,
    keys: Map<String, Value>,
) -> Result<Destination, ConfigError> {
    let raw: RawSection =
        serde_json::from_value(Value::Object(keys)).map_err(|source| ConfigError::Section {
            path: path.to_path_buf(),
            section: label.clone(),
            source,
        })?;

    let mode = match raw.mode.to_ascii_uppercase().as_str() {
        "FTP" => Mode::Ftp,
        "SFTP" => Mode::Sftp,
        _ => {
            return Err(ConfigError::Mode {
                path: path.to_path_buf(),
                section: label,
                mode: raw.mode,
            })
        }
    };

    let port = match raw.port {
        Some(port) => port.parse().map_err(|_| ConfigError::Port {
            path: path.to_path_buf(),
            section: label.clone(),
            port,
        })?,
        None => mode.default_port(),
    };

    let customers = raw
        .customer
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Destination {
        label,
        mode,
        host: raw.host,
        port,
        user: raw.user,
        password: raw.passwd,
        outdir: raw.outdir,
        customers,
    })
}
