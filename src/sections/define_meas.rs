//! `>=DEFINEMEAS` section: reference location and channel layout.
//!
//! ```text
//! >=DEFINEMEAS
//!
//!     MAXRUN=999
//!     MAXMEAS=9999
//!     UNITS=M
//!     REFTYPE=CART
//!     REFLOC="par28ew"
//!     REFLAT=-30:12:49.4693
//!     REFLONG=139:47:50.87
//!     REFELEV=0
//!
//! >HMEAS ID=1001.001 CHTYPE=HX X=0.0 Y=0.0 Z=0.0 AZM=0.0
//! >EMEAS ID=1004.001 CHTYPE=EX X=0.0 Y=0.0 Z=0.0 X2=0.0 Y2=0.0
//! ```
//!
//! Each `>HMEAS`/`>EMEAS` record becomes a [`Channel`] stored under a
//! generated `meas_NN` key derived from its numeric id.

use crate::config::EdiConfig;
use crate::constants::{DEFINEMEAS_MARKER, EMEAS_MARKER, HMEAS_MARKER};
use crate::position::{
    PositionKind, coerce_f64, coerce_usize, decimal_degrees_to_dms, to_decimal_degrees,
};
use crate::sections::scan::{find_section, is_comment, split_key_value, starts_with_marker};
use crate::Result;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Magnetic sensor record (`>HMEAS`)
#[derive(Debug, Clone, PartialEq)]
pub struct MagneticChannel {
    pub id: String,
    /// HX, HY, HZ, RHX or RHY
    pub chtype: String,
    /// Meters north of the reference point
    pub x: f64,
    /// Meters east of the reference point
    pub y: f64,
    /// Sensor azimuth, degrees from north
    pub azm: f64,
    pub acqchan: Option<String>,
    pub extra: BTreeMap<String, String>,
}

/// Electric dipole record (`>EMEAS`)
#[derive(Debug, Clone, PartialEq)]
pub struct ElectricChannel {
    pub id: String,
    /// EX or EY
    pub chtype: String,
    pub x: f64,
    pub y: f64,
    pub x2: f64,
    pub y2: f64,
    pub acqchan: Option<String>,
    pub extra: BTreeMap<String, String>,
}

/// A channel record
#[derive(Debug, Clone, PartialEq)]
pub enum Channel {
    Magnetic(MagneticChannel),
    Electric(ElectricChannel),
}

/// Parse a channel offset, degrading to 0.0
fn offset(fields: &mut BTreeMap<String, String>, key: &str, id: &str) -> f64 {
    match fields.remove(key) {
        Some(value) => coerce_f64(&value).unwrap_or_else(|| {
            warn!("Channel {}: unusable {}='{}', using 0.0", id, key, value);
            0.0
        }),
        None => 0.0,
    }
}

impl Channel {
    /// Build a channel from a record line such as `>HMEAS ID=1 CHTYPE=HX ...`
    ///
    /// Returns `None` for lines that are not channel records.
    pub fn from_record(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        let magnetic = starts_with_marker(trimmed, HMEAS_MARKER);
        if !magnetic && !starts_with_marker(trimmed, EMEAS_MARKER) {
            return None;
        }

        let mut fields: BTreeMap<String, String> = trimmed
            .split_whitespace()
            .skip(1)
            .filter_map(split_key_value)
            .collect();

        let id = fields.remove("id").unwrap_or_default();
        let chtype = fields.remove("chtype").unwrap_or_default().to_uppercase();
        let acqchan = fields.remove("acqchan").or_else(|| fields.remove("acqchn"));

        let channel = if magnetic {
            let x = offset(&mut fields, "x", &id);
            let y = offset(&mut fields, "y", &id);
            let azm = offset(&mut fields, "azm", &id);
            Channel::Magnetic(MagneticChannel {
                id,
                chtype,
                x,
                y,
                azm,
                acqchan,
                extra: fields,
            })
        } else {
            let x = offset(&mut fields, "x", &id);
            let y = offset(&mut fields, "y", &id);
            let x2 = offset(&mut fields, "x2", &id);
            let y2 = offset(&mut fields, "y2", &id);
            Channel::Electric(ElectricChannel {
                id,
                chtype,
                x,
                y,
                x2,
                y2,
                acqchan,
                extra: fields,
            })
        };
        Some(channel)
    }

    pub fn id(&self) -> &str {
        match self {
            Channel::Magnetic(m) => &m.id,
            Channel::Electric(e) => &e.id,
        }
    }

    pub fn chtype(&self) -> &str {
        match self {
            Channel::Magnetic(m) => &m.chtype,
            Channel::Electric(e) => &e.chtype,
        }
    }

    /// Render as a single `>HMEAS`/`>EMEAS` line
    pub fn write_record(&self) -> String {
        match self {
            Channel::Magnetic(m) => {
                let mut line = format!(
                    "{} ID={} CHTYPE={:<3} X={:<4.1} Y={:<4.1} AZM={:<4.1} ACQCHAN={:<4}",
                    HMEAS_MARKER,
                    m.id,
                    m.chtype,
                    m.x,
                    m.y,
                    m.azm,
                    m.acqchan.as_deref().unwrap_or(&m.chtype)
                );
                append_extra(&mut line, &m.extra);
                line
            }
            Channel::Electric(e) => {
                let mut line = format!(
                    "{} ID={} CHTYPE={:<3} X={:<4.1} Y={:<4.1} X2={:<4.1} Y2={:<4.1} ACQCHAN={:<4}",
                    EMEAS_MARKER,
                    e.id,
                    e.chtype,
                    e.x,
                    e.y,
                    e.x2,
                    e.y2,
                    e.acqchan.as_deref().unwrap_or(&e.chtype)
                );
                append_extra(&mut line, &e.extra);
                line
            }
        }
    }
}

fn append_extra(line: &mut String, extra: &BTreeMap<String, String>) {
    for (key, value) in extra {
        line.push_str(&format!(" {}={}", key.to_uppercase(), value));
    }
}

/// Reference location and channel records
#[derive(Debug, Clone, PartialEq)]
pub struct DefineMeasurement {
    pub maxchan: Option<usize>,
    pub maxmeas: Option<usize>,
    pub maxrun: Option<usize>,
    /// Decimal degrees
    pub reflat: Option<f64>,
    /// Decimal degrees
    pub reflon: Option<f64>,
    /// Meters
    pub refelev: Option<f64>,
    /// Coordinate system tag, e.g. `cartesian`
    pub reftype: Option<String>,
    pub refloc: Option<String>,
    pub units: Option<String>,
    /// Channel records keyed `meas_NN`; iteration order is the write order
    pub channels: BTreeMap<String, Channel>,
    pub extra: BTreeMap<String, String>,
}

impl Default for DefineMeasurement {
    fn default() -> Self {
        Self {
            maxchan: None,
            maxmeas: Some(7),
            maxrun: Some(999),
            reflat: None,
            reflon: None,
            refelev: None,
            reftype: Some("cartesian".to_string()),
            refloc: None,
            units: Some("m".to_string()),
            channels: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// Generated key for a channel: rounded numeric id, else the running count
pub fn channel_key(id: &str, count: usize) -> String {
    match coerce_f64(id) {
        Some(numeric) => format!("meas_{:02.0}", numeric),
        None => format!("meas_{:02}", count),
    }
}

impl DefineMeasurement {
    /// Read the `>=DEFINEMEAS` section out of a full document
    pub fn from_lines(lines: &[&str]) -> Result<Self> {
        let mut define_meas = DefineMeasurement::default();
        let section = find_section(
            lines,
            |line| starts_with_marker(line, DEFINEMEAS_MARKER),
            |line| !line.trim_start().starts_with(">="),
        );

        match section {
            Some(section) => define_meas.read_define_measurement(&section.body)?,
            None => warn!("No {} section found", DEFINEMEAS_MARKER),
        }
        Ok(define_meas)
    }

    /// Apply body lines: `KEY=VALUE` metadata and `>XMEAS` records
    pub fn read_define_measurement(&mut self, body: &[&str]) -> Result<()> {
        let mut count = 0;
        for line in body {
            let trimmed = line.trim();
            if is_comment(trimmed) {
                continue;
            }

            if trimmed.starts_with('>') {
                if trimmed.contains('!') {
                    continue;
                }
                match Channel::from_record(trimmed) {
                    Some(channel) => {
                        count += 1;
                        self.insert_channel(channel, count);
                    }
                    None => warn!("Ignoring unrecognised measurement line '{}'", trimmed),
                }
                continue;
            }

            if let Some((key, value)) = split_key_value(trimmed) {
                self.set_field(&key, value)?;
            }
        }

        if self.channels.is_empty() {
            warn!("No >HMEAS/>EMEAS channel records found");
        }
        debug!("Read {} channel records", self.channels.len());
        Ok(())
    }

    /// Store a channel under its generated key
    pub fn insert_channel(&mut self, channel: Channel, count: usize) {
        let key = channel_key(channel.id(), count);
        if let Some(previous) = self.channels.insert(key.clone(), channel) {
            warn!(
                "Channel key {} generated twice, replacing channel {}",
                key,
                previous.id()
            );
        }
    }

    /// Set one metadata field by its EDI key
    pub fn set_field(&mut self, key: &str, value: String) -> Result<()> {
        let key = key.to_lowercase();
        let unset = value.is_empty() || value.eq_ignore_ascii_case("none");
        match key.as_str() {
            "reflat" | "reflatitude" => {
                if !unset {
                    self.reflat = Some(to_decimal_degrees(PositionKind::Latitude, value)?);
                }
            }
            "reflon" | "reflong" | "reflongitude" => {
                if !unset {
                    self.reflon = Some(to_decimal_degrees(PositionKind::Longitude, value)?);
                }
            }
            "refelev" | "refelevation" => {
                if !unset {
                    self.refelev = Some(to_decimal_degrees(PositionKind::Elevation, value)?);
                }
            }
            "maxchan" | "maxchannels" => self.set_count(key.as_str(), value, |d| &mut d.maxchan),
            "maxmeas" | "maxmeasurements" => {
                self.set_count(key.as_str(), value, |d| &mut d.maxmeas)
            }
            "maxrun" => self.set_count(key.as_str(), value, |d| &mut d.maxrun),
            "reftype" => self.reftype = (!unset).then_some(value),
            "refloc" => self.refloc = (!unset).then_some(value),
            "units" => self.units = (!unset).then_some(value),
            _ => {
                self.extra.insert(key, value);
            }
        }
        Ok(())
    }

    /// Integer field with verbatim fallback into `extra`
    fn set_count<F>(&mut self, key: &str, value: String, field: F)
    where
        F: FnOnce(&mut Self) -> &mut Option<usize>,
    {
        match coerce_usize(&value) {
            Some(n) => *field(self) = Some(n),
            None => {
                debug!("Keeping non-integer {}='{}' verbatim", key, value);
                self.extra.insert(key.to_string(), value);
            }
        }
    }

    /// Render the `>=DEFINEMEAS` block followed by the channel records
    pub fn write_define_measurement(&self, config: &EdiConfig) -> Vec<String> {
        let entries: [(&str, Option<String>); 9] = [
            ("MAXCHAN", self.maxchan.map(|v| v.to_string())),
            ("MAXRUN", self.maxrun.map(|v| v.to_string())),
            ("MAXMEAS", self.maxmeas.map(|v| v.to_string())),
            ("REFLAT", self.reflat.map(decimal_degrees_to_dms)),
            ("REFLON", self.reflon.map(decimal_degrees_to_dms)),
            ("REFELEV", Some(format!("{:.3}", self.refelev.unwrap_or(0.0)))),
            ("REFTYPE", self.reftype.clone()),
            ("REFLOC", self.refloc.clone()),
            ("UNITS", self.units.clone()),
        ];

        let mut lines = vec![DEFINEMEAS_MARKER.to_string(), String::new()];
        for (key, value) in entries {
            if let Some(value) = value {
                lines.push(format!("{}{}={}", config.indent, key, value));
            }
        }
        for (key, value) in &self.extra {
            lines.push(format!("{}{}={}", config.indent, key.to_uppercase(), value));
        }
        lines.push(String::new());

        if self.channels.is_empty() {
            warn!("No channel records to write");
        }
        lines.extend(self.channels.values().map(Channel::write_record));
        lines
    }

    /// Look up a channel by its declared id
    pub fn channel_by_id(&self, id: &str) -> Option<&Channel> {
        self.channels.values().find(|c| c.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINEMEAS: &str = r#">=DEFINEMEAS

    MAXRUN=999
    MAXMEAS=9999
    UNITS=M
    REFTYPE=CART
    REFLOC="par28ew"
    REFLAT=-30:12:49.4693
    REFLONG=139:47:50.87
    REFELEV=0

>HMEAS ID=1001.001 CHTYPE=HX X=0.0 Y=0.0 Z=0.0 AZM=0.0
>HMEAS ID=1002.001 CHTYPE=HY X=0.0 Y=0.0 Z=0.0 AZM=90.0
>HMEAS ID=1003.001 CHTYPE=HZ X=0.0 Y=0.0 Z=0.0 AZM=0.0
>EMEAS ID=1004.001 CHTYPE=EX X=-50.0 Y=0.0 Z=0.0 X2=50.0 Y2=0.0
>EMEAS ID=1005.001 CHTYPE=EY X=0.0 Y=-50.0 Z=0.0 X2=0.0 Y2=50.0
>!comment line!
>=MTSECT
    NFREQ=2
"#;

    fn parsed() -> DefineMeasurement {
        let lines: Vec<&str> = DEFINEMEAS.lines().collect();
        DefineMeasurement::from_lines(&lines).unwrap()
    }

    #[test]
    fn test_reference_fields() {
        let dm = parsed();
        assert_eq!(dm.maxrun, Some(999));
        assert_eq!(dm.maxmeas, Some(9999));
        assert_eq!(dm.units.as_deref(), Some("M"));
        assert_eq!(dm.reftype.as_deref(), Some("CART"));
        assert_eq!(dm.refloc.as_deref(), Some("par28ew"));
        assert_eq!(dm.refelev, Some(0.0));

        let reflat = dm.reflat.unwrap();
        assert!((reflat - -(30.0 + 12.0 / 60.0 + 49.4693 / 3600.0)).abs() < 1e-12);
        let reflon = dm.reflon.unwrap();
        assert!((reflon - (139.0 + 47.0 / 60.0 + 50.87 / 3600.0)).abs() < 1e-12);
    }

    #[test]
    fn test_channel_records() {
        let dm = parsed();
        assert_eq!(dm.channels.len(), 5);

        let keys: Vec<&str> = dm.channels.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["meas_1001", "meas_1002", "meas_1003", "meas_1004", "meas_1005"]
        );

        match &dm.channels["meas_1002"] {
            Channel::Magnetic(h) => {
                assert_eq!(h.id, "1002.001");
                assert_eq!(h.chtype, "HY");
                assert_eq!(h.azm, 90.0);
                assert_eq!(h.extra.get("z").map(String::as_str), Some("0.0"));
            }
            other => panic!("expected magnetic channel, got {:?}", other),
        }

        match &dm.channels["meas_1004"] {
            Channel::Electric(e) => {
                assert_eq!(e.chtype, "EX");
                assert_eq!(e.x, -50.0);
                assert_eq!(e.x2, 50.0);
            }
            other => panic!("expected electric channel, got {:?}", other),
        }

        assert_eq!(dm.channel_by_id("1005.001").map(Channel::chtype), Some("EY"));
    }

    #[test]
    fn test_bad_channel_field_degrades() {
        let channel =
            Channel::from_record(">HMEAS ID=7 CHTYPE=HX X=abc Y=1.5 AZM=0").unwrap();
        match channel {
            Channel::Magnetic(h) => {
                assert_eq!(h.x, 0.0);
                assert_eq!(h.y, 1.5);
            }
            other => panic!("expected magnetic channel, got {:?}", other),
        }
    }

    #[test]
    fn test_channel_key_fallback() {
        assert_eq!(channel_key("1", 9), "meas_01");
        assert_eq!(channel_key("1003.001", 9), "meas_1003");
        assert_eq!(channel_key("", 3), "meas_03");
        assert_eq!(channel_key("abc", 12), "meas_12");
    }

    #[test]
    fn test_non_integer_count_kept_verbatim() {
        let mut dm = DefineMeasurement::default();
        dm.read_define_measurement(&["MAXCHAN=many"]).unwrap();
        assert_eq!(dm.maxchan, None);
        assert_eq!(dm.extra.get("maxchan").map(String::as_str), Some("many"));
    }

    #[test]
    fn test_write_define_measurement() {
        let dm = parsed();
        let lines = dm.write_define_measurement(&EdiConfig::default());

        assert_eq!(lines[0], ">=DEFINEMEAS");
        assert!(lines.contains(&"    REFLAT=-30:12:49.47".to_string()));
        assert!(lines.contains(&"    REFLON=139:47:50.87".to_string()));
        assert!(lines.contains(&"    REFELEV=0.000".to_string()));

        let records: Vec<&String> = lines.iter().filter(|l| l.starts_with(">")).collect();
        assert_eq!(records.len(), 6);
        assert!(records[1].starts_with(">HMEAS ID=1001.001 CHTYPE=HX  X=0.0  Y=0.0  AZM=0.0"));
        assert!(records[4].starts_with(">EMEAS ID=1004.001 CHTYPE=EX  X=-50.0 Y=0.0  X2=50.0"));
    }

    #[test]
    fn test_written_records_read_back() {
        let dm = parsed();
        let written = dm.write_define_measurement(&EdiConfig::default());
        let lines: Vec<&str> = written.iter().map(String::as_str).collect();
        let reread = DefineMeasurement::from_lines(&lines).unwrap();

        assert_eq!(reread.channels.len(), dm.channels.len());
        for (key, channel) in &dm.channels {
            assert_eq!(reread.channels[key].id(), channel.id());
            assert_eq!(reread.channels[key].chtype(), channel.chtype());
        }
    }
}
