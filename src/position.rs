//! Position and number coercion.
//!
//! EDI files store latitude and longitude either as decimal degrees or as
//! sexagesimal `DD:MM:SS.ss` strings with the sign on the degree field.
//! Internally every position is decimal degrees and every elevation is meters.

use crate::{Error, Result};
use std::fmt;
use tracing::warn;

/// Which coordinate a value describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionKind {
    Latitude,
    Longitude,
    Elevation,
}

impl fmt::Display for PositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionKind::Latitude => write!(f, "latitude"),
            PositionKind::Longitude => write!(f, "longitude"),
            PositionKind::Elevation => write!(f, "elevation"),
        }
    }
}

/// A position value as supplied by a caller or read from a file
#[derive(Debug, Clone, PartialEq)]
pub enum PositionInput {
    Decimal(f64),
    Text(String),
}

impl From<f64> for PositionInput {
    fn from(value: f64) -> Self {
        PositionInput::Decimal(value)
    }
}

impl From<i32> for PositionInput {
    fn from(value: i32) -> Self {
        PositionInput::Decimal(f64::from(value))
    }
}

impl From<&str> for PositionInput {
    fn from(value: &str) -> Self {
        PositionInput::Text(value.to_string())
    }
}

impl From<String> for PositionInput {
    fn from(value: String) -> Self {
        PositionInput::Text(value)
    }
}

/// Convert a decimal, numeric string or sexagesimal string to decimal degrees
///
/// Elevations are coerced to meters and never fail: anything unparsable
/// becomes `0.0`.
pub fn to_decimal_degrees(kind: PositionKind, value: impl Into<PositionInput>) -> Result<f64> {
    let text = match value.into() {
        PositionInput::Decimal(v) => return Ok(v),
        PositionInput::Text(text) => text,
    };
    let trimmed = text.trim();

    if kind == PositionKind::Elevation {
        return Ok(coerce_f64(trimmed).unwrap_or_else(|| {
            warn!("No usable elevation in '{}', using 0.0", trimmed);
            0.0
        }));
    }

    if trimmed.contains(':') {
        return parse_sexagesimal(kind, trimmed);
    }

    coerce_f64(trimmed).ok_or_else(|| {
        Error::format(
            kind.to_string(),
            format!("'{}' is neither decimal degrees nor DD:MM:SS", trimmed),
        )
    })
}

/// Parse `DD:MM:SS.ss` with the sign carried on the degree field
fn parse_sexagesimal(kind: PositionKind, text: &str) -> Result<f64> {
    let fields: Vec<&str> = text.split(':').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(Error::format(
            kind.to_string(),
            format!(
                "'{}' has {} fields, expected DD:MM:SS",
                text,
                fields.len()
            ),
        ));
    }

    let mut parsed = [0.0_f64; 3];
    for (slot, field) in parsed.iter_mut().zip(&fields) {
        *slot = field.parse::<f64>().map_err(|_| {
            Error::format(
                kind.to_string(),
                format!("'{}' contains non-numeric field '{}'", text, field),
            )
        })?;
    }

    // "-00:30:00" must stay negative even though -0.0 == 0.0
    let negative = fields[0].starts_with('-');
    let magnitude = parsed[0].abs() + parsed[1] / 60.0 + parsed[2] / 3600.0;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Format decimal degrees as zero-padded `DD:MM:SS.ss`
///
/// A leading `-` is written only for negative values.
pub fn decimal_degrees_to_dms(value: f64) -> String {
    // work in hundredths of a second so rounding carries into minutes/degrees
    let hundredths = (value.abs() * 360_000.0).round() as u64;
    let degrees = hundredths / 360_000;
    let remainder = hundredths % 360_000;
    let minutes = remainder / 6_000;
    let centiseconds = remainder % 6_000;

    let sign = if value < 0.0 && hundredths > 0 { "-" } else { "" };

    format!(
        "{}{:02}:{:02}:{:02}.{:02}",
        sign,
        degrees,
        minutes,
        centiseconds / 100,
        centiseconds % 100
    )
}

/// Best-effort float parse, tolerating surrounding quotes and whitespace
pub fn coerce_f64(text: &str) -> Option<f64> {
    let cleaned = text.trim().trim_matches('"').trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer parse that also accepts integral floats such as `"12.0"`
pub fn coerce_usize(text: &str) -> Option<usize> {
    let cleaned = text.trim().trim_matches('"').trim();
    cleaned.parse::<usize>().ok().or_else(|| {
        cleaned
            .parse::<f64>()
            .ok()
            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as usize)
    })
}
