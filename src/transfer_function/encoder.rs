//! Numeric block encoding.
//!
//! Every block is a `>LABEL [ROT=...] // n` marker followed by values in
//! fixed-width scientific notation, `block_len` per line, and a blank line.
//! Zeros in data blocks are written as the header's empty value.

use super::{BlockLabel, ImpedanceTensor, Part, Tipper, IMPEDANCE_LABELS, TIPPER_LABELS};
use crate::config::EdiConfig;
use crate::constants::{
    banner, FREQUENCY_BANNER, IMPEDANCE_BANNER, TIPPER_BANNER, TROT_BANNER, ZROT_BANNER,
};
use crate::{Error, Result};
use std::borrow::Cow;

/// Format one value as signed scientific notation with a two-digit exponent
///
/// Non-negative values get a leading space in place of the sign, and the
/// result is right-aligned to `width`.
pub fn format_value(value: f64, width: usize, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    let body = match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if mantissa.starts_with('-') { "" } else { " " };
            let exp_sign = if exponent < 0 { '-' } else { '+' };
            format!("{}{}e{}{:02}", sign, mantissa, exp_sign, exponent.abs())
        }
        None => raw,
    };
    format!("{:>width$}", body, width = width)
}

/// Render one labelled block
pub fn write_data_block(
    values: &[f64],
    label: &str,
    empty: f64,
    config: &EdiConfig,
) -> Result<Vec<String>> {
    let block = BlockLabel::parse(label).ok_or_else(|| {
        Error::format("data blocks", format!("cannot write block '{}'", label))
    })?;
    if config.block_len == 0 {
        return Err(Error::configuration("block length must be at least 1"));
    }

    let marker = match block.rotation_source() {
        Some(rot) => format!(">{} ROT={} // {}", block, rot, values.len()),
        None => format!(">{} // {}", block, values.len()),
    };

    let mut lines = Vec::with_capacity(values.len() / config.block_len + 2);
    lines.push(marker);
    for chunk in values.chunks(config.block_len) {
        let line: String = chunk
            .iter()
            .map(|&value| {
                let value = if block.is_data() && value == 0.0 {
                    empty
                } else {
                    value
                };
                format_value(value, config.field_width, config.precision)
            })
            .collect();
        lines.push(line);
    }
    lines.push(String::new());
    Ok(lines)
}

/// Render frequency, rotation, impedance and tipper blocks with their banners
pub fn write_transfer_function(
    z: &ImpedanceTensor,
    tipper: &Tipper,
    empty: f64,
    config: &EdiConfig,
) -> Result<Vec<String>> {
    let n = z.len();
    z.validate(Some(n))?;

    let tipper = if tipper.tipper.is_empty() && n > 0 {
        Cow::Owned(Tipper::zeros(z.freq.clone()))
    } else {
        Cow::Borrowed(tipper)
    };
    tipper.validate(Some(n))?;

    let mut lines = Vec::new();

    lines.push(banner(FREQUENCY_BANNER));
    lines.extend(write_data_block(&z.freq, "freq", empty, config)?);

    lines.push(banner(ZROT_BANNER));
    lines.extend(write_data_block(
        &z.rotation_angle.expand(n)?,
        "zrot",
        empty,
        config,
    )?);

    lines.push(banner(IMPEDANCE_BANNER));
    for (index, labels) in IMPEDANCE_LABELS.iter().enumerate() {
        let (row, col) = (index / 2, index % 2);
        let components = z.component(row, col);
        for (part, label) in [Part::Real, Part::Imag, Part::Variance].iter().zip(labels) {
            let values: Vec<f64> = match part {
                Part::Real => components.iter().map(|c| c.re).collect(),
                Part::Imag => components.iter().map(|c| c.im).collect(),
                Part::Variance => z.variance(row, col),
            };
            lines.extend(write_data_block(&values, label, empty, config)?);
        }
    }

    lines.push(banner(TROT_BANNER));
    lines.extend(write_data_block(
        &tipper.rotation_angle.expand(n)?,
        "trot",
        empty,
        config,
    )?);

    lines.push(banner(TIPPER_BANNER));
    for (col, labels) in TIPPER_LABELS.iter().enumerate() {
        let components = tipper.component(col);
        for (part, label) in [Part::Real, Part::Imag, Part::Variance].iter().zip(labels) {
            let values: Vec<f64> = match part {
                Part::Real => components.iter().map(|c| c.re).collect(),
                Part::Imag => components.iter().map(|c| c.im).collect(),
                Part::Variance => tipper.tipper_err.iter().map(|v| v[col]).collect(),
            };
            lines.extend(write_data_block(&values, label, empty, config)?);
        }
    }

    Ok(lines)
}
