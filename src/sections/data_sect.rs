//! `>=MTSECT` / `>=SPECTRASECT` section: which channel ids feed the data.
//!
//! ```text
//! >=MTSECT
//!     EX=1004.001
//!     EY=1005.001
//!     HX=1001.001
//!     HY=1002.001
//!     HZ=1003.001
//!     NFREQ=40
//!     SECTID="par28ew"
//! ```

use crate::config::EdiConfig;
use crate::constants::{MTSECT_MARKER, SPECTRASECT_MARKER};
use crate::position::coerce_usize;
use crate::sections::scan::{find_section, is_comment, split_key_value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Form of the numeric body following the data section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    /// Impedance and tipper blocks
    #[default]
    Impedance,
    /// Raw cross-power spectra
    Spectra,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Impedance => write!(f, "z"),
            DataType::Spectra => write!(f, "spectra"),
        }
    }
}

/// Channel mapping and frequency count of the data section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSection {
    pub data_type: DataType,
    /// Index of the section marker in the source, if one was read
    pub line_num: Option<usize>,
    pub ex: Option<String>,
    pub ey: Option<String>,
    pub hx: Option<String>,
    pub hy: Option<String>,
    pub hz: Option<String>,
    pub nfreq: Option<usize>,
    /// Mirrors the station name
    pub sectid: Option<String>,
    pub nchan: Option<usize>,
    pub maxblks: Option<usize>,
    pub extra: BTreeMap<String, String>,
}

/// A `>=...SECT` marker that is not `>=DEFINEMEAS`
fn is_data_marker(line: &str) -> bool {
    let upper = line.trim_start().to_uppercase();
    upper.starts_with(">=") && upper.contains("SECT")
}

impl DataSection {
    /// Read the data section out of a full document
    pub fn from_lines(lines: &[&str]) -> Self {
        let mut data_sect = DataSection::default();
        match find_section(lines, is_data_marker, |_| false) {
            Some(section) => {
                data_sect.line_num = Some(section.start);
                let marker = section.marker.to_uppercase();
                if marker.contains("SPECT") {
                    data_sect.data_type = DataType::Spectra;
                } else if !marker.contains("MT") {
                    warn!("Unrecognised data section '{}', assuming impedance", marker);
                }
                data_sect.read_data_sect(&section.body);
            }
            None => warn!(
                "No {} or {} section found",
                MTSECT_MARKER, SPECTRASECT_MARKER
            ),
        }
        data_sect
    }

    /// Apply `KEY=VALUE` body lines
    pub fn read_data_sect(&mut self, body: &[&str]) {
        for line in body {
            if is_comment(line) {
                continue;
            }
            if let Some((key, value)) = split_key_value(line) {
                self.set_field(&key, value);
            }
        }
        debug!(
            "Data section: type={}, nfreq={:?}, sectid={:?}",
            self.data_type, self.nfreq, self.sectid
        );
    }

    /// Set one field; counts fall back to verbatim storage in `extra`
    pub fn set_field(&mut self, key: &str, value: String) {
        let key = key.to_lowercase();
        match key.as_str() {
            "ex" => self.ex = Some(value),
            "ey" => self.ey = Some(value),
            "hx" => self.hx = Some(value),
            "hy" => self.hy = Some(value),
            "hz" => self.hz = Some(value),
            "sectid" => self.sectid = Some(value),
            "nfreq" | "nchan" | "maxblks" => self.set_count(key, value),
            _ => {
                self.extra.insert(key, value);
            }
        }
    }

    fn set_count(&mut self, key: String, value: String) {
        let Some(n) = coerce_usize(&value) else {
            warn!("Non-integer {}='{}' kept verbatim", key, value);
            self.extra.insert(key, value);
            return;
        };

        match key.as_str() {
            "nfreq" => self.nfreq = Some(n),
            "nchan" => self.nchan = Some(n),
            _ => self.maxblks = Some(n),
        }
    }

    /// Render the data section block
    pub fn write_data_sect(&self, config: &EdiConfig) -> Vec<String> {
        let marker = match self.data_type {
            DataType::Impedance => MTSECT_MARKER,
            DataType::Spectra => SPECTRASECT_MARKER,
        };

        let entries: [(&str, Option<String>); 9] = [
            ("EX", self.ex.clone()),
            ("EY", self.ey.clone()),
            ("HX", self.hx.clone()),
            ("HY", self.hy.clone()),
            ("HZ", self.hz.clone()),
            ("NFREQ", self.nfreq.map(|v| v.to_string())),
            ("SECTID", self.sectid.clone()),
            ("NCHAN", self.nchan.map(|v| v.to_string())),
            ("MAXBLKS", self.maxblks.map(|v| v.to_string())),
        ];

        let mut lines = vec![String::new(), marker.to_string()];
        for (key, value) in entries {
            if let Some(value) = value {
                lines.push(format!("{}{}={}", config.indent, key, value));
            }
        }
        for (key, value) in &self.extra {
            lines.push(format!("{}{}={}", config.indent, key.to_uppercase(), value));
        }
        lines.push(String::new());
        lines
    }
}
