//! # `vcgencmd`-backed diagnostics.
//!
//! ```text
//! $ vcgencmd measure_temp        → temp=42.8'C
//! $ vcgencmd measure_clock arm   → frequency(48)=1500345728
//! $ vcgencmd get_throttled       → throttled=0x50000
//! ```

use std::{path::PathBuf, process::Command};

use crate::{
    error::{DiagnosticsError, WorkerError},
    metrics::Diagnostics,
};

/// Firmware diagnostics through the `vcgencmd` tool.
#[derive(Clone, Debug)]
pub struct Vcgencmd {
    path: PathBuf,
}

impl Vcgencmd {
    /// Resolves `vcgencmd` on `PATH`.
    pub fn new() -> Result<Self, WorkerError> {
        let path = which::which("vcgencmd").map_err(|_| WorkerError::ExecutableNotFound {
            executable: "vcgencmd".to_string(),
        })?;
        Ok(Self { path })
    }

    /// Runs `vcgencmd <args>` and returns the text after `=`.
    fn query(&self, args: &[&str]) -> Result<String, DiagnosticsError> {
        let command = format!("vcgencmd {}", args.join(" "));
        let out = Command::new(&self.path)
            .args(args)
            .output()
            .map_err(|source| DiagnosticsError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !out.status.success() {
            return Err(DiagnosticsError::Status {
                command,
                status: out.status,
            });
        }
        let stdout = String::from_utf8_lossy(&out.stdout);
        value_of(&stdout)
            .map(str::to_string)
            .ok_or_else(|| DiagnosticsError::Malformed {
                command,
                output: stdout.trim().to_string(),
            })
    }
}

impl Diagnostics for Vcgencmd {
    fn temperature(&self) -> Result<f64, DiagnosticsError> {
        let raw = self.query(&["measure_temp"])?;
        parse_temperature(&raw).ok_or_else(|| malformed("vcgencmd measure_temp", raw))
    }

    fn clock_speed(&self) -> Result<u64, DiagnosticsError> {
        let raw = self.query(&["measure_clock", "arm"])?;
        raw.parse()
            .map_err(|_| malformed("vcgencmd measure_clock arm", raw))
    }

    fn throttled(&self) -> Result<u32, DiagnosticsError> {
        let raw = self.query(&["get_throttled"])?;
        parse_throttled(&raw).ok_or_else(|| malformed("vcgencmd get_throttled", raw))
    }
}

fn malformed(command: &str, output: String) -> DiagnosticsError {
    DiagnosticsError::Malformed {
        command: command.to_string(),
        output,
    }
}

fn value_of(output: &str) -> Option<&str> {
    let (_, value) = output.trim().split_once('=')?;
    Some(value.trim())
}

/// `42.8'C` → `42.8`
fn parse_temperature(raw: &str) -> Option<f64> {
    raw.trim_end_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .ok()
}

/// `0x50005` → `327685`
fn parse_throttled(raw: &str) -> Option<u32> {
    let hex = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_of() {
        assert_eq!(value_of("temp=42.8'C\n"), Some("42.8'C"));
        assert_eq!(value_of("frequency(48)=1500345728"), Some("1500345728"));
        assert_eq!(value_of("error: unknown command"), None);
    }

    #[test]
    fn test_parse_temperature_strips_unit() {
        assert_eq!(parse_temperature("42.8'C"), Some(42.8));
        assert_eq!(parse_temperature("40.0"), Some(40.0));
        assert_eq!(parse_temperature("'C"), None);
    }

    #[test]
    fn test_parse_throttled_hex() {
        assert_eq!(parse_throttled("0x0"), Some(0));
        assert_eq!(parse_throttled("0x50005"), Some(0x50005));
        assert_eq!(parse_throttled("80000"), Some(0x80000));
        assert_eq!(parse_throttled("0xZZ"), None);
    }
}
