//! `.env` file parsing
//!
//! Accepted syntax, one assignment per line:
//!
//! ```text
//! # comment
//! API_URL=https://example.com
//! export TOKEN="quoted value"
//! EMPTY=
//! ```
//!
//! Blank lines and `#` comment lines are skipped. A single pair of matching
//! surrounding quotes is stripped from values. Lines without `=` or with an
//! invalid variable name are skipped with a warning.

use kontext_core::Warning;
use kontext_core::name::is_valid_variable_name;
use std::fs;
use std::path::{Path, PathBuf};

/// Parsed `.env` contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    /// Assignments in file order (later duplicates win when exported)
    pub entries: Vec<(String, String)>,
    /// Lines that were skipped
    pub warnings: Vec<Warning>,
}

impl EnvFile {
    /// Variable names in file order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

/// Read and parse an env file
///
/// A missing or unreadable file is a warning, never an error.
pub fn load(path: &Path) -> Result<EnvFile, Warning> {
    if !path.is_file() {
        return Err(Warning::EnvFileMissing {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| Warning::InvalidEnvEntry {
        path: path.to_path_buf(),
        line: 0,
        reason: format!("unreadable: {e}"),
    })?;
    Ok(parse(&content, path))
}

/// Parse env file text; `origin` is only used in warnings
pub fn parse(content: &str, origin: &Path) -> EnvFile {
    let mut env = EnvFile::default();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").map_or(line, str::trim_start);

        let Some((key, value)) = line.split_once('=') else {
            env.warnings.push(skip(origin, index, "missing '='"));
            continue;
        };

        let key = key.trim();
        if !is_valid_variable_name(key) {
            env.warnings
                .push(skip(origin, index, &format!("invalid variable name '{key}'")));
            continue;
        }

        env.entries
            .push((key.to_string(), strip_quotes(value.trim()).to_string()));
    }

    env
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn skip(origin: &Path, index: usize, reason: &str) -> Warning {
    Warning::InvalidEnvEntry {
        path: PathBuf::from(origin),
        line: index + 1,
        reason: reason.to_string(),
    }
}
