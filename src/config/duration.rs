//! `MustExceed`-style duration strings: `<N>[ ]?<unit>`.
//!
//! Unit is matched as a prefix of one of `seconds`, `minutes`, `hours`,
//! `days`, `weeks` (case-insensitive); an empty or bare-number unit is
//! rejected rather than assumed.

use crate::error::{Result, SnapbackError};

const UNIT_SECONDS: &[&str] = &["s", "se", "sec", "seco", "secon", "second", "seconds"];
const UNIT_MINUTES: &[&str] = &["m", "mi", "min", "minu", "minut", "minute", "minutes"];
const UNIT_HOURS: &[&str] = &["h", "ho", "hou", "hour", "hours"];
const UNIT_DAYS: &[&str] = &["d", "da", "day", "days"];
const UNIT_WEEKS: &[&str] = &["w", "we", "wee", "week", "weeks"];

/// Parse a duration string into seconds.
///
/// # Errors
///
/// Returns an error if the string has no numeric prefix or the unit
/// doesn't match any known unit's prefix set.
pub fn parse_duration_seconds(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (num_str, rest) = trimmed.split_at(split_at);
    if num_str.is_empty() {
        return Err(bad_duration(input));
    }
    let n: u64 = num_str.parse().map_err(|_| bad_duration(input))?;
    let unit = rest.trim().to_ascii_lowercase();
    if unit.is_empty() {
        return Err(bad_duration(input));
    }

    let multiplier = if UNIT_SECONDS.contains(&unit.as_str()) {
        1
    } else if UNIT_MINUTES.contains(&unit.as_str()) {
        60
    } else if UNIT_HOURS.contains(&unit.as_str()) {
        3600
    } else if UNIT_DAYS.contains(&unit.as_str()) {
        86400
    } else if UNIT_WEEKS.contains(&unit.as_str()) {
        604_800
    } else {
        return Err(bad_duration(input));
    };

    Ok(n * multiplier)
}

fn bad_duration(input: &str) -> SnapbackError {
    SnapbackError::ConfigParse {
        path: "<duration>".into(),
        line: 0,
        message: format!("invalid duration {input:?}"),
    }
}

/// Parse a snapback boolean: `yes|y|on|true|1` (case-insensitive, with
/// non-alphanumeric characters stripped first) is true; anything else
/// is false.
#[must_use]
pub fn parse_bool(input: &str) -> bool {
    let cleaned: String = input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(cleaned.as_str(), "yes" | "y" | "on" | "true" | "1")
}
