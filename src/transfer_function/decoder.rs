//! Numeric block decoding.
//!
//! A block opens at a `>LABEL` marker whose label starts with `Z`, `T` or
//! is `FREQ`, and collects whitespace-separated values until the next
//! marker. Any other marker closes the current block. Values equal to the
//! empty sentinel are read as `0.0`.

use super::{
    BlockLabel, Complex64, ImpedanceTensor, Part, RotationAngle, Tipper, IMPEDANCE_LABELS,
    TIPPER_LABELS,
};
use crate::constants::EMPTY_VALUE;
use crate::sections::data_sect::DataType;
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Values of one block and the count its marker declared
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBlock {
    pub values: Vec<f64>,
    pub declared: Option<usize>,
}

/// Collect every numeric block following the data section, keyed by lowercase label
pub fn collect_blocks(lines: &[&str], empty: f64) -> Result<BTreeMap<String, RawBlock>> {
    let mut blocks: BTreeMap<String, RawBlock> = BTreeMap::new();
    let mut current: Option<String> = None;

    for (index, &line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('>') {
            if trimmed.contains('!') {
                continue;
            }
            let label = trimmed[1..]
                .split_whitespace()
                .next()
                .map(str::to_lowercase)
                .ok_or_else(|| {
                    Error::format("data blocks", format!("empty block marker at line {}", index))
                })?;

            if label == "freq" || label.starts_with('z') || label.starts_with('t') {
                let label = canonical_label(&label);
                if blocks.contains_key(&label) {
                    warn!("Block '{}' appears more than once, keeping the last", label);
                }
                blocks.insert(
                    label.clone(),
                    RawBlock {
                        values: Vec::new(),
                        declared: declared_count(trimmed),
                    },
                );
                current = Some(label);
            } else {
                debug!("Skipping block '{}'", label);
                current = None;
            }
            continue;
        }

        if trimmed.contains('!') {
            continue;
        }

        if let Some(block) = current.as_ref().and_then(|label| blocks.get_mut(label)) {
            block
                .values
                .extend(trimmed.split_whitespace().map(|token| parse_value(token, empty)));
        }
    }

    for (label, block) in &blocks {
        if let Some(declared) = block.declared {
            if declared != block.values.len() {
                warn!(
                    "Block '{}' declares {} values but holds {}",
                    label,
                    declared,
                    block.values.len()
                );
            }
        }
    }

    Ok(blocks)
}

/// Decode the impedance tensor and tipper from the lines after the data section marker
pub fn decode_transfer_function(
    lines: &[&str],
    data_type: DataType,
    nfreq: Option<usize>,
    empty: f64,
) -> Result<(ImpedanceTensor, Tipper)> {
    if data_type == DataType::Spectra {
        return Err(Error::not_implemented("reading spectra data sections"));
    }

    let mut blocks = collect_blocks(lines, empty)?;

    let freq = blocks
        .remove("freq")
        .map(|block| block.values)
        .ok_or_else(|| Error::inconsistent("no >FREQ block"))?;

    let n = match nfreq {
        Some(n) if n != freq.len() => {
            return Err(Error::inconsistent(format!(
                "NFREQ={} but >FREQ holds {} values",
                n,
                freq.len()
            )));
        }
        Some(n) => n,
        None => {
            warn!("NFREQ not given, using {} frequencies from >FREQ", freq.len());
            freq.len()
        }
    };

    let mut z = ImpedanceTensor::zeros(freq.clone());
    for (index, labels) in IMPEDANCE_LABELS.iter().enumerate() {
        let (row, col) = (index / 2, index % 2);
        let [re, im, var] = take_entry(&mut blocks, labels, n)?;
        for f in 0..n {
            z.z[f][row][col] = Complex64::new(re[f], im[f]);
            z.z_err[f][row][col] = var[f];
        }
    }
    if let Some(angles) = take_optional(&mut blocks, BlockLabel::ZRot, n)? {
        z.rotation_angle = RotationAngle::PerFrequency(angles);
    }

    let mut tipper = Tipper::zeros(freq);
    if blocks.contains_key(TIPPER_LABELS[0][0]) {
        for (col, labels) in TIPPER_LABELS.iter().enumerate() {
            let [re, im, var] = take_entry(&mut blocks, labels, n)?;
            for f in 0..n {
                tipper.tipper[f][col] = Complex64::new(re[f], im[f]);
                tipper.tipper_err[f][col] = var[f];
            }
        }
    } else {
        warn!("No tipper blocks, tipper set to zero");
    }
    if let Some(angles) = take_optional(&mut blocks, BlockLabel::TRot, n)? {
        tipper.rotation_angle = RotationAngle::PerFrequency(angles);
    }

    for label in blocks.keys() {
        debug!("Ignoring unused block '{}'", label);
    }

    Ok((z, tipper))
}

/// Real, imaginary and variance blocks of one tensor entry
fn take_entry(
    blocks: &mut BTreeMap<String, RawBlock>,
    labels: &[&str; 3],
    n: usize,
) -> Result<[Vec<f64>; 3]> {
    let mut take = |part: Part| -> Result<Vec<f64>> {
        let label = labels[part as usize];
        let block = blocks
            .remove(label)
            .ok_or_else(|| Error::inconsistent(format!("missing block '{}'", label)))?;
        check_block_len(label, &block.values, n)?;
        Ok(block.values)
    };
    Ok([take(Part::Real)?, take(Part::Imag)?, take(Part::Variance)?])
}

fn take_optional(
    blocks: &mut BTreeMap<String, RawBlock>,
    label: BlockLabel,
    n: usize,
) -> Result<Option<Vec<f64>>> {
    match blocks.remove(label.as_str()) {
        Some(block) => {
            check_block_len(label.as_str(), &block.values, n)?;
            Ok(Some(block.values))
        }
        None => Ok(None),
    }
}

fn check_block_len(label: &str, values: &[f64], n: usize) -> Result<()> {
    if values.len() == n {
        Ok(())
    } else {
        Err(Error::inconsistent(format!(
            "block '{}' holds {} values for {} frequencies",
            label,
            values.len(),
            n
        )))
    }
}

fn canonical_label(label: &str) -> String {
    match BlockLabel::parse(label) {
        Some(known) => known.as_str().to_string(),
        None => label.to_string(),
    }
}

/// Count after `//` in a block marker, if any
fn declared_count(marker: &str) -> Option<usize> {
    let (_, count) = marker.split_once("//")?;
    count.split_whitespace().next()?.parse().ok()
}

fn parse_value(token: &str, empty: f64) -> f64 {
    match token.parse::<f64>() {
        Ok(value) if value == empty || value == EMPTY_VALUE => 0.0,
        Ok(value) => value,
        Err(_) => {
            warn!("Unreadable value '{}' read as 0", token);
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(label: &str, rot: &str, values: &[f64]) -> String {
        let mut text = format!(">{}{} // {}\n", label, rot, values.len());
        let line: Vec<String> = values.iter().map(|v| format!("{:e}", v)).collect();
        text.push_str(&line.join(" "));
        text.push('\n');
        text
    }

    fn two_freq_body(with_tipper: bool) -> String {
        let mut body = String::from("!****FREQUENCIES****!\n");
        body.push_str(&block("FREQ", "", &[10.0, 1.0]));
        body.push_str(&block("ZROT", "", &[0.0, 0.0]));
        for (i, labels) in IMPEDANCE_LABELS.iter().enumerate() {
            let base = (i + 1) as f64;
            body.push_str(&block(&labels[0].to_uppercase(), " ROT=ZROT", &[base, base * 2.0]));
            body.push_str(&block(&labels[1].to_uppercase(), " ROT=ZROT", &[-base, 1.0e32]));
            body.push_str(&block(&labels[2].to_uppercase(), " ROT=ZROT", &[0.1, 0.2]));
        }
        if with_tipper {
            body.push_str(&block("TROT", "", &[5.0, 5.0]));
            for labels in TIPPER_LABELS.iter() {
                body.push_str(&block(&labels[0].to_uppercase(), " ROT=TROT", &[0.3, 0.4]));
                body.push_str(&block(&labels[1].to_uppercase(), " ROT=TROT", &[0.0, -0.1]));
                body.push_str(&block(&labels[2].to_uppercase(), " ROT=TROT", &[0.01, 0.02]));
            }
        }
        body.push_str(">END\n");
        body
    }

    #[test]
    fn test_decode_impedance_and_tipper() {
        let body = two_freq_body(true);
        let lines: Vec<&str> = body.lines().collect();
        let (z, t) =
            decode_transfer_function(&lines, DataType::Impedance, Some(2), EMPTY_VALUE).unwrap();

        assert_eq!(z.freq, vec![10.0, 1.0]);
        assert_eq!(z.z[0][0][0], Complex64::new(1.0, -1.0));
        assert_eq!(z.z[1][0][1], Complex64::new(4.0, 0.0));
        assert_eq!(z.z[0][1][1], Complex64::new(4.0, -4.0));
        assert_eq!(z.z_err[1][1][0], 0.2);
        assert_eq!(z.rotation_angle, RotationAngle::PerFrequency(vec![0.0, 0.0]));

        assert!(t.has_data());
        assert_eq!(t.tipper[0][1], Complex64::new(0.3, 0.0));
        assert_eq!(t.tipper[1][0], Complex64::new(0.4, -0.1));
        assert_eq!(t.rotation_angle, RotationAngle::PerFrequency(vec![5.0, 5.0]));
    }

    #[test]
    fn test_missing_tipper_is_zero_filled() {
        let body = two_freq_body(false);
        let lines: Vec<&str> = body.lines().collect();
        let (z, t) =
            decode_transfer_function(&lines, DataType::Impedance, Some(2), EMPTY_VALUE).unwrap();

        assert_eq!(z.len(), 2);
        assert_eq!(t.len(), 2);
        assert!(!t.has_data());
        assert_eq!(t.rotation_angle, RotationAngle::Scalar(0.0));
    }

    #[test]
    fn test_nfreq_mismatch_is_rejected() {
        let body = two_freq_body(true);
        let lines: Vec<&str> = body.lines().collect();
        let result = decode_transfer_function(&lines, DataType::Impedance, Some(3), EMPTY_VALUE);
        assert!(matches!(result, Err(Error::InconsistentData { .. })));
    }

    #[test]
    fn test_missing_nfreq_uses_frequency_count() {
        let body = two_freq_body(false);
        let lines: Vec<&str> = body.lines().collect();
        let (z, _) =
            decode_transfer_function(&lines, DataType::Impedance, None, EMPTY_VALUE).unwrap();
        assert_eq!(z.len(), 2);
    }

    #[test]
    fn test_spectra_not_implemented() {
        let result = decode_transfer_function(&[], DataType::Spectra, None, EMPTY_VALUE);
        assert!(matches!(result, Err(Error::NotImplemented { .. })));
    }

    #[test]
    fn test_missing_impedance_block() {
        let text = block("FREQ", "", &[1.0]);
        let lines: Vec<&str> = text.lines().collect();
        let result = decode_transfer_function(&lines, DataType::Impedance, Some(1), EMPTY_VALUE);
        assert!(matches!(result, Err(Error::InconsistentData { .. })));
    }

    #[test]
    fn test_collect_blocks_skips_unrelated_blocks() {
        let text = ">FREQ // 2\n 1.0 2.0\n>RHOXY // 2\n 9 9\n>ZXXR ROT=ZROT // 2\n 3 1.0e32\n";
        let lines: Vec<&str> = text.lines().collect();
        let blocks = collect_blocks(&lines, EMPTY_VALUE).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks["freq"].values, vec![1.0, 2.0]);
        assert_eq!(blocks["zxxr"].values, vec![3.0, 0.0]);
        assert_eq!(blocks["zxxr"].declared, Some(2));
    }

    #[test]
    fn test_declared_count() {
        assert_eq!(declared_count(">FREQ // 40"), Some(40));
        assert_eq!(declared_count(">ZXXR ROT=ZROT //12"), Some(12));
        assert_eq!(declared_count(">FREQ"), None);
    }

    #[test]
    fn test_custom_empty_value() {
        assert_eq!(parse_value("-999", -999.0), 0.0);
        assert_eq!(parse_value("1.0e32", -999.0), 0.0);
        assert_eq!(parse_value("2.5E+01", -999.0), 25.0);
        assert_eq!(parse_value("abc", -999.0), 0.0);
    }
}
