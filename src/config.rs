//! Source configuration: delimiter, encoding, and the malformed-row policy.
//!
//! Options resolve in three layers: built-in defaults, an optional YAML file,
//! then explicit command-line overrides.
//!
//! ```yaml
//! delimiter: semicolon
//! encoding: windows-1252
//! malformed: skip
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::io_utils;

pub const DEFAULT_SOURCE_DELIMITER: u8 = b';';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum MalformedPolicy {
    /// Abort the load on the first malformed row
    #[default]
    Reject,
    /// Exclude malformed rows and report how many were skipped
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub malformed: MalformedPolicy,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_SOURCE_DELIMITER,
            encoding: encoding_rs::UTF_8,
            malformed: MalformedPolicy::default(),
        }
    }
}

/// On-disk form of [`SourceOptions`]; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub malformed: Option<MalformedPolicy>,
}

impl SourceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).with_context(|| format!("Parsing config YAML {path:?}"))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("Parsing config YAML")
    }

    /// Later values win; `None` keeps what `self` already holds.
    pub fn merge(mut self, overrides: SourceConfig) -> Self {
        if overrides.delimiter.is_some() {
            self.delimiter = overrides.delimiter;
        }
        if overrides.encoding.is_some() {
            self.encoding = overrides.encoding;
        }
        if overrides.malformed.is_some() {
            self.malformed = overrides.malformed;
        }
        self
    }

    pub fn resolve(&self) -> Result<SourceOptions> {
        let defaults = SourceOptions::default();
        let delimiter = match self.delimiter.as_deref() {
            Some(token) => parse_delimiter(token).map_err(|err| anyhow!(err))?,
            None => defaults.delimiter,
        };
        let encoding = io_utils::resolve_encoding(self.encoding.as_deref())?;
        Ok(SourceOptions {
            delimiter,
            encoding,
            malformed: self.malformed.unwrap_or(defaults.malformed),
        })
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err(format!("Delimiter '{other}' must be a single character"));
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_export_format() {
        let options = SourceConfig::default().resolve().expect("resolve");
        assert_eq!(options, SourceOptions::default());
        assert_eq!(options.delimiter, b';');
    }

    #[test]
    fn yaml_values_are_overridden_by_cli() {
        let file =
            SourceConfig::from_yaml_str("delimiter: tab\nencoding: latin1\nmalformed: skip\n")
                .expect("yaml");
        let cli = SourceConfig {
            delimiter: Some(",".to_string()),
            ..SourceConfig::default()
        };
        let options = file.merge(cli).resolve().expect("resolve");
        assert_eq!(options.delimiter, b',');
        assert_eq!(options.encoding, encoding_rs::WINDOWS_1252);
        assert_eq!(options.malformed, MalformedPolicy::Skip);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_delimiters() {
        assert!(SourceConfig::from_yaml_str("sep: ';'\n").is_err());
        assert!(parse_delimiter(";;").is_err());
        assert!(
            SourceConfig {
                encoding: Some("klingon".to_string()),
                ..SourceConfig::default()
            }
            .resolve()
            .is_err()
        );
    }
}
