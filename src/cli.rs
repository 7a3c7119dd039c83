//! Command-line flags. Every flag is optional and, when given, overrides the
//! value loaded from the environment.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Serves the loading page and pushes status updates to connected browsers
#[derive(Parser, Debug, Default)]
#[command(name = "loading-status-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// HTTP service address, `host:port` or `:port`
    #[arg(long)]
    pub addr: Option<String>,

    /// Path to the status file
    #[arg(long = "status-file")]
    pub status_file: Option<PathBuf>,

    /// Path to the loading page markup
    #[arg(long = "html")]
    pub html_file: Option<PathBuf>,

    /// Interval between status file checks, e.g. `1s`, `500ms`, `1m30s`
    #[arg(long = "check-interval", value_parser = parse_duration)]
    pub check_interval: Option<Duration>,

    /// URL probed to decide whether the target application is ready
    #[arg(long = "probe-url")]
    pub probe_url: Option<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Parse a duration written as a sequence of `<number><unit>` pairs such as
/// `1s`, `1.5s` or `1h2m3s`. Units are `ns`, `us`, `µs`, `ms`, `s`, `m` and `h`.
/// A bare `0` is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut rest = input;
    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, after) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid duration '{input}'"))?;

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, next) = after.split_at(unit_len);
        let nanos_per_unit = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration '{input}'")),
            other => return Err(format!("unknown unit '{other}' in duration '{input}'")),
        };

        total_nanos += value * nanos_per_unit;
        rest = next;
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
