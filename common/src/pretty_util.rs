use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use byte_unit::{Byte, UnitType};
use pretty_duration::pretty_duration;
use serde::Serialize;

/// How to render a value for the startup banner / summary output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Plain,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "plain" | "none" => Ok(OutputFormat::Plain),
            other => Err(format!("unknown output format {other:?}, expected json|yaml|plain")),
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Yaml
    }
}

/// Wall-clock duration, formatted for a log line (e.g. `3 minutes 12 seconds`).
pub fn to_duration_pretty(duration: &Duration) -> String {
    pretty_duration(duration, None)
}

/// Byte count, formatted with the appropriate decimal unit (e.g. `4.20 MB`).
pub fn to_bytes_len_pretty(len: usize) -> String {
    let byte = Byte::from_u128(len as u128).unwrap_or(Byte::from_u128(0).unwrap());
    let adjusted = byte.get_appropriate_unit(UnitType::Decimal);
    format!("{adjusted:.2}")
}

pub fn to_string_pretty<T: Serialize + Debug>(format: OutputFormat, val: &T) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(val)
            .unwrap_or_else(|e| format!("<failed to render as json: {e}; value: {val:?}>")),
        OutputFormat::Yaml => serde_yaml::to_string(val)
            .unwrap_or_else(|e| format!("<failed to render as yaml: {e}; value: {val:?}>")),
        OutputFormat::Plain => format!("{val:?}"),
    }
}
