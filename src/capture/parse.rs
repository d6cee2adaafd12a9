use once_cell::sync::Lazy;
use regex::Regex;

/// One parsed measurement line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading {
    /// 1-based wire channel number as printed by the instrument.
    pub channel: usize,
    pub value_ns: i64,
}

// The instrument prints the magnitude unsigned and a literal leading '-'
// for negative readings, so the sign is applied after parsing the digits.
static MEASUREMENT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\*{5}Measurement channel ([1-9]\d*): (-?)(\d+) ns$")
        .unwrap_or_else(|e| panic!("invalid measurement line pattern: {e}"))
});

/// Extracts `(channel, signed value)` from one line of instrument output.
///
/// Anything that does not match the exact line format, including partial
/// matches and trailing garbage, yields `None`; the caller decides whether
/// to log the line or drop it.
pub fn parse_measurement_line(line: &str) -> Option<Reading> {
    let captures = MEASUREMENT_LINE.captures(line.trim_end_matches(['\r', '\n']))?;
    let channel: usize = captures[1].parse().ok()?;
    let magnitude: u64 = captures[3].parse().ok()?;
    let magnitude = i64::try_from(magnitude).ok()?;
    let value_ns = if &captures[2] == "-" {
        -magnitude
    } else {
        magnitude
    };
    Some(Reading { channel, value_ns })
}
