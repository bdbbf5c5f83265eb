//! `>HEAD` section: station identity, provenance and position.
//!
//! A typical block:
//!
//! ```text
//! >HEAD
//!
//!     ACQBY=None
//!     DATAID=par28ew
//!     ELEV=0.000
//!     EMPTY=1e+32
//!     FILEBY=WG3DForward
//!     LAT=-30:12:49
//!     LON=139:47:50
//!     PROGVERS=WINGLINK EDI 1.0.22
//! ```
//!
//! Positions are held in decimal degrees whatever the file used.

use crate::config::EdiConfig;
use crate::constants::{EMPTY_VALUE, FILEDATE_FORMAT, HEAD_MARKER, PHOENIX_PROGVERS_MARKER};
use crate::position::{
    PositionKind, coerce_f64, decimal_degrees_to_dms, to_decimal_degrees,
};
use crate::sections::scan::{find_simple_section, is_comment, is_marker, split_key_value};
use crate::Result;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Header metadata of one EDI file
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Station name
    pub dataid: Option<String>,
    pub acqby: Option<String>,
    pub acqdate: Option<String>,
    pub fileby: Option<String>,
    pub filedate: Option<String>,
    /// Location description; country/state/prospect fold into this
    pub loc: Option<String>,
    /// Decimal degrees
    pub lat: Option<f64>,
    /// Decimal degrees
    pub lon: Option<f64>,
    /// Meters
    pub elev: Option<f64>,
    /// Value standing in for missing data in numeric blocks
    pub empty: f64,
    pub progvers: Option<String>,
    pub progdate: Option<String>,
    pub stdvers: Option<String>,
    pub units: Option<String>,
    /// Keys this reader does not model, kept for write-out
    pub extra: BTreeMap<String, String>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            dataid: None,
            acqby: None,
            acqdate: None,
            fileby: None,
            filedate: None,
            loc: None,
            lat: None,
            lon: None,
            elev: None,
            empty: EMPTY_VALUE,
            progvers: None,
            progdate: None,
            stdvers: None,
            units: None,
            extra: BTreeMap::new(),
        }
    }
}

/// "None" is how unset values are written by several producers
fn is_unset(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("none")
}

fn optional(value: String) -> Option<String> {
    if is_unset(&value) { None } else { Some(value) }
}

/// Shortest form of the sentinel that parses back to the same value
fn format_empty(value: f64) -> String {
    let text = format!("{:E}", value);
    match text.split_once('E') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => {
            format!("{}.0E{}", mantissa, exponent)
        }
        _ => text,
    }
}

impl Header {
    /// Read the `>HEAD` section out of a full document
    pub fn from_lines(lines: &[&str]) -> Result<Self> {
        let mut header = Header::default();
        match find_simple_section(lines, HEAD_MARKER) {
            Some(section) => header.read_header(&section.body)?,
            None => warn!("No {} section found, header left empty", HEAD_MARKER),
        }
        Ok(header)
    }

    /// Apply `KEY=VALUE` lines to this header
    pub fn read_header(&mut self, header_lines: &[&str]) -> Result<()> {
        let mut count = 0;
        for line in header_lines {
            if is_marker(line) || is_comment(line) {
                continue;
            }
            if let Some((key, value)) = split_key_value(line) {
                self.set_field(&key, value)?;
                count += 1;
            }
        }

        if count == 0 {
            warn!("Header section contains no KEY=VALUE lines");
        }
        debug!("Read {} header fields for station {:?}", count, self.dataid);
        Ok(())
    }

    /// Set one field by its (case-insensitive) EDI key
    pub fn set_field(&mut self, key: &str, value: String) -> Result<()> {
        let key = key.to_lowercase();
        match key.as_str() {
            "lat" | "latitude" => {
                if !is_unset(&value) {
                    self.lat = Some(to_decimal_degrees(PositionKind::Latitude, value)?);
                }
            }
            "lon" | "long" | "longitude" => {
                if !is_unset(&value) {
                    self.lon = Some(to_decimal_degrees(PositionKind::Longitude, value)?);
                }
            }
            "elev" | "elevation" => {
                if !is_unset(&value) {
                    self.elev = Some(to_decimal_degrees(PositionKind::Elevation, value)?);
                }
            }
            "country" | "state" | "loc" | "location" | "prospect" => {
                if !is_unset(&value) {
                    self.loc = Some(match self.loc.take() {
                        Some(existing) => format!("{}, {}", existing, value),
                        None => value,
                    });
                }
            }
            "empty" => {
                self.empty = coerce_f64(&value).unwrap_or_else(|| {
                    warn!("Unusable EMPTY value '{}', keeping {:e}", value, EMPTY_VALUE);
                    EMPTY_VALUE
                });
            }
            "dataid" => self.dataid = optional(value),
            "acqby" => self.acqby = optional(value),
            "acqdate" => self.acqdate = optional(value),
            "fileby" => self.fileby = optional(value),
            "filedate" => self.filedate = optional(value),
            "progvers" => self.progvers = optional(value),
            "progdate" => self.progdate = optional(value),
            "stdvers" => self.stdvers = optional(value),
            "units" => self.units = optional(value),
            _ => {
                self.extra.insert(key, value);
            }
        }
        Ok(())
    }

    /// True when the file was written by Phoenix MT-Editor
    pub fn is_phoenix(&self) -> bool {
        self.progvers
            .as_deref()
            .is_some_and(|v| v.to_lowercase().contains(PHOENIX_PROGVERS_MARKER))
    }

    /// Render the `>HEAD` block, one entry per line
    pub fn write_header(&self, config: &EdiConfig) -> Vec<String> {
        let filedate = chrono::Utc::now().format(FILEDATE_FORMAT).to_string();
        let fileby = self
            .fileby
            .clone()
            .unwrap_or_else(|| config.program_name.clone());
        let progvers = self
            .progvers
            .clone()
            .unwrap_or_else(|| config.program_name.clone());
        let progdate = self
            .progdate
            .clone()
            .unwrap_or_else(|| config.program_date.clone());

        let entries: [(&str, Option<String>); 14] = [
            ("ACQBY", self.acqby.clone()),
            ("ACQDATE", self.acqdate.clone()),
            ("DATAID", self.dataid.clone()),
            ("ELEV", self.elev.map(|e| format!("{:.3}", e))),
            ("EMPTY", Some(format_empty(self.empty))),
            ("FILEBY", Some(fileby)),
            ("FILEDATE", Some(filedate)),
            ("LAT", self.lat.map(decimal_degrees_to_dms)),
            ("LOC", self.loc.clone()),
            ("LON", self.lon.map(decimal_degrees_to_dms)),
            ("PROGDATE", Some(progdate)),
            ("PROGVERS", Some(progvers)),
            ("STDVERS", self.stdvers.clone()),
            ("UNITS", self.units.clone()),
        ];

        let mut lines = vec![HEAD_MARKER.to_string(), String::new()];
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
