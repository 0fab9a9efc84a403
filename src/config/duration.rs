//! # Durations
//!
//! Durations in the environment are written as a whole number followed by
//! one unit: `ms`, `s`, `m`, `h` or `d`. Compound forms such as `1h30m` are
//! not accepted.
//!
//! Values above `MAX_DURATION` are rejected.

use anyhow::{anyhow, bail, Result};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Longest duration any setting may hold (ten years)
pub const MAX_DURATION: Duration = Duration::from_secs(3650 * 86_400);

static DURATION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+)(ms|s|m|h|d)$").ok());

fn unit_millis(unit: &str) -> Option<u64> {
    match unit {
        "ms" => Some(1),
        "s" => Some(1_000),
        "m" => Some(60_000),
        "h" => Some(3_600_000),
        "d" => Some(86_400_000),
        _ => None,
    }
}

/// Parse a setting such as `500ms`, `30s`, `10m`, `24h` or `30d`
///
/// Surrounding whitespace and letter case are ignored. Zero and anything
/// above `MAX_DURATION` is an error.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let value = raw.trim().to_lowercase();
    let pattern = DURATION_PATTERN
        .as_ref()
        .ok_or_else(|| anyhow!("duration pattern failed to compile"))?;

    let Some(captures) = pattern.captures(&value) else {
        bail!("'{}' is not a duration; use <number><ms|s|m|h|d>, e.g. 30s or 30d", raw.trim());
    };
    let (_, [count, unit]) = captures.extract();

    let count: u64 = count
        .parse()
        .map_err(|_| anyhow!("'{}' is larger than {:?}", raw.trim(), MAX_DURATION))?;
    if count == 0 {
        bail!("'{}' must be longer than zero", raw.trim());
    }

    let duration = unit_millis(unit)
        .and_then(|factor| count.checked_mul(factor))
        .map(Duration::from_millis)
        .filter(|duration| *duration <= MAX_DURATION)
        .ok_or_else(|| anyhow!("'{}' is larger than {:?}", raw.trim(), MAX_DURATION))?;

    Ok(duration)
}
