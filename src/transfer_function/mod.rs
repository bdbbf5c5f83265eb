//! Transfer-function model: impedance tensor and tipper per frequency.
//!
//! ## Architecture
//!
//! - [`decoder`] - turns the labelled numeric blocks after the data section
//!   into [`ImpedanceTensor`] and [`Tipper`]
//! - [`encoder`] - renders the model back into labelled fixed-width blocks
//!
//! Every per-frequency array has one entry per frequency. A model whose
//! arrays disagree in length is rejected by `validate`.

pub mod decoder;
pub mod encoder;

pub use decoder::decode_transfer_function;
pub use encoder::{format_value, write_data_block, write_transfer_function};

use crate::{Error, Result};
pub use num_complex::Complex64;
use std::fmt;

/// Rotation applied to the data, one angle or one per frequency
#[derive(Debug, Clone, PartialEq)]
pub enum RotationAngle {
    Scalar(f64),
    PerFrequency(Vec<f64>),
}

impl Default for RotationAngle {
    fn default() -> Self {
        RotationAngle::Scalar(0.0)
    }
}

impl RotationAngle {
    /// One angle per frequency, broadcasting a scalar
    pub fn expand(&self, nfreq: usize) -> Result<Vec<f64>> {
        match self {
            RotationAngle::Scalar(angle) => Ok(vec![*angle; nfreq]),
            RotationAngle::PerFrequency(angles) if angles.len() == nfreq => Ok(angles.clone()),
            RotationAngle::PerFrequency(angles) => Err(Error::inconsistent(format!(
                "{} rotation angles for {} frequencies",
                angles.len(),
                nfreq
            ))),
        }
    }
}

/// Real, imaginary or variance part of a tensor entry, in label-column order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Real,
    Imag,
    Variance,
}

/// Labels of the impedance blocks, indexed `[2 * row + col][part]`
pub const IMPEDANCE_LABELS: [[&str; 3]; 4] = [
    ["zxxr", "zxxi", "zxx.var"],
    ["zxyr", "zxyi", "zxy.var"],
    ["zyxr", "zyxi", "zyx.var"],
    ["zyyr", "zyyi", "zyy.var"],
];

/// Labels of the tipper blocks, indexed `[col][part]`
pub const TIPPER_LABELS: [[&str; 3]; 2] = [
    ["txr.exp", "txi.exp", "txvar.exp"],
    ["tyr.exp", "tyi.exp", "tyvar.exp"],
];

const PARTS: [Part; 3] = [Part::Real, Part::Imag, Part::Variance];

/// Identity of one numeric block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLabel {
    Freq,
    ZRot,
    TRot,
    Impedance { row: usize, col: usize, part: Part },
    Tipper { col: usize, part: Part },
}

impl BlockLabel {
    /// Recognise a block label, case-insensitively
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "freq" => return Some(BlockLabel::Freq),
            "zrot" => return Some(BlockLabel::ZRot),
            "trot" | "trot.exp" => return Some(BlockLabel::TRot),
            _ => {}
        }

        for (index, labels) in IMPEDANCE_LABELS.iter().enumerate() {
            if let Some(p) = labels.iter().position(|l| *l == label) {
                return Some(BlockLabel::Impedance {
                    row: index / 2,
                    col: index % 2,
                    part: PARTS[p],
                });
            }
        }
        for (col, labels) in TIPPER_LABELS.iter().enumerate() {
            if let Some(p) = labels.iter().position(|l| *l == label) {
                return Some(BlockLabel::Tipper {
                    col,
                    part: PARTS[p],
                });
            }
        }
        None
    }

    /// Canonical lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockLabel::Freq => "freq",
            BlockLabel::ZRot => "zrot",
            BlockLabel::TRot => "trot",
            BlockLabel::Impedance { row, col, part } => {
                IMPEDANCE_LABELS[2 * row + col][*part as usize]
            }
            BlockLabel::Tipper { col, part } => TIPPER_LABELS[*col][*part as usize],
        }
    }

    /// Rotation block the values refer to, written as `ROT=...`
    pub fn rotation_source(&self) -> Option<&'static str> {
        match self {
            BlockLabel::Impedance { .. } => Some("ZROT"),
            BlockLabel::Tipper { .. } => Some("TROT"),
            _ => None,
        }
    }

    /// Data blocks carry the empty sentinel in place of zeros
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            BlockLabel::Impedance { .. } | BlockLabel::Tipper { .. }
        )
    }
}

impl fmt::Display for BlockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// 2x2 complex impedance tensor per frequency
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImpedanceTensor {
    /// Frequencies in Hz, in file order
    pub freq: Vec<f64>,
    /// `z[f][row][col]`
    pub z: Vec<[[Complex64; 2]; 2]>,
    /// Variance of each entry, same indexing as `z`
    pub z_err: Vec<[[f64; 2]; 2]>,
    pub rotation_angle: RotationAngle,
}

impl ImpedanceTensor {
    /// Zero-filled tensor for the given frequencies
    pub fn zeros(freq: Vec<f64>) -> Self {
        let n = freq.len();
        Self {
            freq,
            z: vec![[[Complex64::new(0.0, 0.0); 2]; 2]; n],
            z_err: vec![[[0.0; 2]; 2]; n],
            rotation_angle: RotationAngle::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.freq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freq.is_empty()
    }

    /// Periods in seconds
    pub fn periods(&self) -> Vec<f64> {
        self.freq.iter().map(|f| 1.0 / f).collect()
    }

    /// One tensor entry across all frequencies
    pub fn component(&self, row: usize, col: usize) -> Vec<Complex64> {
        self.z.iter().map(|m| m[row][col]).collect()
    }

    /// Variance of one tensor entry across all frequencies
    pub fn variance(&self, row: usize, col: usize) -> Vec<f64> {
        self.z_err.iter().map(|m| m[row][col]).collect()
    }

    /// Check every array against the frequency count
    pub fn validate(&self, nfreq: Option<usize>) -> Result<()> {
        let n = nfreq.unwrap_or(self.freq.len());
        check_len("frequencies", self.freq.len(), n)?;
        check_len("impedance", self.z.len(), n)?;
        check_len("impedance variance", self.z_err.len(), n)?;
        if let RotationAngle::PerFrequency(angles) = &self.rotation_angle {
            check_len("impedance rotation", angles.len(), n)?;
        }
        Ok(())
    }
}

/// 1x2 complex tipper per frequency
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tipper {
    pub freq: Vec<f64>,
    /// `tipper[f][col]`, col 0 = Tx, col 1 = Ty
    pub tipper: Vec<[Complex64; 2]>,
    pub tipper_err: Vec<[f64; 2]>,
    pub rotation_angle: RotationAngle,
}

impl Tipper {
    /// Zero-filled tipper for the given frequencies
    pub fn zeros(freq: Vec<f64>) -> Self {
        let n = freq.len();
        Self {
            freq,
            tipper: vec![[Complex64::new(0.0, 0.0); 2]; n],
            tipper_err: vec![[0.0; 2]; n],
            rotation_angle: RotationAngle::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.freq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freq.is_empty()
    }

    /// False when every value is zero, as after decoding a file without tipper blocks
    pub fn has_data(&self) -> bool {
        self.tipper
            .iter()
            .flatten()
            .any(|t| t.re != 0.0 || t.im != 0.0)
            || self.tipper_err.iter().flatten().any(|v| *v != 0.0)
    }

    pub fn periods(&self) -> Vec<f64> {
        self.freq.iter().map(|f| 1.0 / f).collect()
    }

    /// One tipper entry across all frequencies
    pub fn component(&self, col: usize) -> Vec<Complex64> {
        self.tipper.iter().map(|t| t[col]).collect()
    }

    pub fn validate(&self, nfreq: Option<usize>) -> Result<()> {
        let n = nfreq.unwrap_or(self.freq.len());
        check_len("tipper frequencies", self.freq.len(), n)?;
        check_len("tipper", self.tipper.len(), n)?;
        check_len("tipper variance", self.tipper_err.len(), n)?;
        if let RotationAngle::PerFrequency(angles) = &self.rotation_angle {
            check_len("tipper rotation", angles.len(), n)?;
        }
        Ok(())
    }
}

fn check_len(what: &str, found: usize, expected: usize) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(Error::inconsistent(format!(
            "{} has {} entries, expected {}",
            what, found, expected
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_label_parse() {
        assert_eq!(BlockLabel::parse("FREQ"), Some(BlockLabel::Freq));
        assert_eq!(BlockLabel::parse("TROT.EXP"), Some(BlockLabel::TRot));
        assert_eq!(
            BlockLabel::parse("ZYX.VAR"),
            Some(BlockLabel::Impedance {
                row: 1,
                col: 0,
                part: Part::Variance
            })
        );
        assert_eq!(
            BlockLabel::parse("tyi.exp"),
            Some(BlockLabel::Tipper {
                col: 1,
                part: Part::Imag
            })
        );
        assert_eq!(BlockLabel::parse("zxx"), None);
        assert_eq!(BlockLabel::parse("rhoxy"), None);
    }

    #[test]
    fn test_block_label_names_roundtrip() {
        for labels in IMPEDANCE_LABELS.iter().chain(TIPPER_LABELS.iter()) {
            for label in labels {
                let parsed = BlockLabel::parse(label).unwrap();
                assert_eq!(parsed.as_str(), *label);
            }
        }
        assert_eq!(BlockLabel::parse("zxy.var").unwrap().to_string(), "ZXY.VAR");
    }

    #[test]
    fn test_rotation_sources() {
        assert_eq!(BlockLabel::parse("zxxr").unwrap().rotation_source(), Some("ZROT"));
        assert_eq!(BlockLabel::parse("txr.exp").unwrap().rotation_source(), Some("TROT"));
        assert_eq!(BlockLabel::Freq.rotation_source(), None);
        assert_eq!(BlockLabel::ZRot.rotation_source(), None);
        assert!(!BlockLabel::TRot.is_data());
        assert!(BlockLabel::parse("zyyi").unwrap().is_data());
    }

    #[test]
    fn test_rotation_expand() {
        assert_eq!(RotationAngle::Scalar(30.0).expand(3).unwrap(), vec![30.0; 3]);
        assert_eq!(
            RotationAngle::PerFrequency(vec![1.0, 2.0]).expand(2).unwrap(),
            vec![1.0, 2.0]
        );
        assert!(matches!(
            RotationAngle::PerFrequency(vec![1.0]).expand(2),
            Err(Error::InconsistentData { .. })
        ));
    }

    #[test]
    fn test_zeros_shape_and_validate() {
        let z = ImpedanceTensor::zeros(vec![10.0, 1.0, 0.1]);
        assert_eq!(z.len(), 3);
        assert_eq!(z.z.len(), 3);
        assert!(z.validate(Some(3)).is_ok());
        assert!(matches!(
            z.validate(Some(4)),
            Err(Error::InconsistentData { .. })
        ));
        assert_eq!(z.periods(), vec![0.1, 1.0, 10.0]);

        let t = Tipper::zeros(vec![10.0, 1.0, 0.1]);
        assert!(!t.has_data());
        assert!(t.validate(Some(3)).is_ok());
    }

    #[test]
    fn test_component_access() {
        let mut z = ImpedanceTensor::zeros(vec![1.0, 2.0]);
        z.z[1][0][1] = Complex64::new(3.0, -4.0);
        z.z_err[1][0][1] = 0.5;

        assert_eq!(
            z.component(0, 1),
            vec![Complex64::new(0.0, 0.0), Complex64::new(3.0, -4.0)]
        );
        assert_eq!(z.variance(0, 1), vec![0.0, 0.5]);
    }
}
