//! EDI document: the sections and transfer function of one station.
//!
//! Reading builds every section from the same line buffer, decodes the
//! numeric blocks that follow the data section, then runs a single
//! reconciliation pass that fills unset header positions from the
//! reference location of `>=DEFINEMEAS`. Writing regenerates every block
//! in a fixed order and replaces the target file atomically.

use crate::config::EdiConfig;
use crate::constants::END_MARKER;
use crate::filesystem::{make_unique_filename, write_atomic};
use crate::position::{PositionInput, PositionKind, to_decimal_degrees};
use crate::sections::{DataSection, DataType, DefineMeasurement, Header, Information};
use crate::transfer_function::{
    ImpedanceTensor, Tipper, decode_transfer_function, write_transfer_function,
};
use crate::{Error, Result};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// One EDI file in memory
#[derive(Debug, Clone, Default)]
pub struct Edi {
    /// File the document was read from, reused as the default save target
    pub path: Option<PathBuf>,
    pub header: Header,
    pub info: Information,
    pub define_measurement: DefineMeasurement,
    pub data_sect: DataSection,
    pub z: ImpedanceTensor,
    pub tipper: Tipper,
    pub config: EdiConfig,
}

impl Edi {
    /// Empty document with default formatting
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty document with custom formatting
    pub fn with_config(config: EdiConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Read an EDI file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, EdiConfig::default())
    }

    /// Read an EDI file, keeping `config` for later writes
    pub fn open_with_config(path: impl AsRef<Path>, config: EdiConfig) -> Result<Self> {
        let mut edi = Self::with_config(config);
        edi.read_edi_file(path)?;
        Ok(edi)
    }

    /// Replace this document's contents with those of `path`
    pub fn read_edi_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::missing_input(path.display().to_string()));
        }

        let bytes = fs::read(path)
            .map_err(|e| Error::io(format!("Failed to read {}", path.display()), e))?;
        let text = String::from_utf8_lossy(&bytes);
        self.parse_text(&text)?;
        self.path = Some(path.to_path_buf());

        info!(
            "Read {} with {} frequencies for station {}",
            path.display(),
            self.z.len(),
            self.station().unwrap_or("<unnamed>")
        );
        Ok(())
    }

    /// Parse a whole document held in memory
    pub fn parse_text(&mut self, text: &str) -> Result<()> {
        let lines: Vec<&str> = text.lines().collect();

        let header = Header::from_lines(&lines)?;
        let info = Information::from_lines(&lines);
        let define_measurement = DefineMeasurement::from_lines(&lines)?;
        let data_sect = DataSection::from_lines(&lines);

        let start = data_sect.line_num.ok_or_else(|| {
            Error::format("data section", "no >=MTSECT or >=SPECTRASECT section")
        })?;
        let (z, tipper) = decode_transfer_function(
            &lines[start + 1..],
            data_sect.data_type,
            data_sect.nfreq,
            header.empty,
        )?;

        self.header = header;
        self.info = info;
        self.define_measurement = define_measurement;
        self.data_sect = data_sect;
        self.z = z;
        self.tipper = tipper;
        if self.data_sect.nfreq.is_none() {
            self.data_sect.nfreq = Some(self.z.len());
        }

        self.reconcile_position();
        Ok(())
    }

    /// Fill unset header coordinates from the measurement reference location
    ///
    /// Latitude, longitude and elevation are handled independently, and a
    /// value already present in the header always wins.
    pub fn reconcile_position(&mut self) {
        let reference = &self.define_measurement;
        let fallbacks = [
            (&mut self.header.lat, reference.reflat, PositionKind::Latitude),
            (&mut self.header.lon, reference.reflon, PositionKind::Longitude),
            (&mut self.header.elev, reference.refelev, PositionKind::Elevation),
        ];

        for (slot, fallback, kind) in fallbacks {
            if slot.is_none() {
                if let Some(value) = fallback {
                    info!("Header {} unset, using reference value {}", kind, value);
                    *slot = Some(value);
                }
            }
        }
    }

    /// Render the whole document as EDI text
    pub fn to_edi_string(&self) -> Result<String> {
        self.config.validate()?;
        if self.data_sect.data_type == DataType::Spectra {
            return Err(Error::not_implemented("writing spectra data sections"));
        }
        self.validate()?;

        let mut data_sect = self.data_sect.clone();
        data_sect.nfreq = Some(self.z.len());
        if data_sect.sectid.is_none() {
            data_sect.sectid = self.header.dataid.clone();
        }

        let mut lines = self.header.write_header(&self.config);
        lines.extend(self.info.write_info(&self.config));
        lines.extend(self.define_measurement.write_define_measurement(&self.config));
        lines.extend(data_sect.write_data_sect(&self.config));
        lines.extend(write_transfer_function(
            &self.z,
            &self.tipper,
            self.header.empty,
            &self.config,
        )?);
        lines.push(END_MARKER.to_string());

        let mut text = lines.join("\n");
        text.push('\n');
        Ok(text)
    }

    /// Write the document and return the path written
    ///
    /// Without an explicit target the source path is reused, else
    /// `<cwd>/<station>.edi`; either is made unique unless the config says
    /// otherwise. Nothing is written if rendering fails.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let target = match path {
            Some(path) => path.to_path_buf(),
            None => self.derived_target()?,
        };

        let text = self.to_edi_string()?;
        write_atomic(&target, &text)?;
        info!("Wrote {}", target.display());
        Ok(target)
    }

    fn derived_target(&self) -> Result<PathBuf> {
        let base = match &self.path {
            Some(path) => path.clone(),
            None => {
                let station = self.station().ok_or_else(|| {
                    Error::missing_input("no save path and no station name to derive one")
                })?;
                std::env::current_dir()?.join(format!("{}.edi", station))
            }
        };

        if self.config.unique_filenames {
            Ok(make_unique_filename(&base))
        } else {
            Ok(base)
        }
    }

    /// Check the numeric model against the declared frequency count
    pub fn validate(&self) -> Result<()> {
        self.z.validate(self.data_sect.nfreq)?;
        if !self.tipper.tipper.is_empty() {
            self.tipper.validate(Some(self.z.len()))?;
        }
        Ok(())
    }

    pub fn station(&self) -> Option<&str> {
        self.header.dataid.as_deref()
    }

    /// Set the station name on the header and the data section together
    pub fn set_station(&mut self, station: impl Display) {
        let station = station.to_string();
        debug!("Station renamed to {}", station);
        self.data_sect.sectid = Some(station.clone());
        self.header.dataid = Some(station);
    }

    /// Decimal degrees
    pub fn latitude(&self) -> Option<f64> {
        self.header.lat
    }

    /// Accepts decimal degrees or `DD:MM:SS.ss`
    pub fn set_latitude(&mut self, value: impl Into<PositionInput>) -> Result<()> {
        self.header.lat = Some(to_decimal_degrees(PositionKind::Latitude, value)?);
        Ok(())
    }

    /// Decimal degrees
    pub fn longitude(&self) -> Option<f64> {
        self.header.lon
    }

    /// Accepts decimal degrees or `DD:MM:SS.ss`
    pub fn set_longitude(&mut self, value: impl Into<PositionInput>) -> Result<()> {
        self.header.lon = Some(to_decimal_degrees(PositionKind::Longitude, value)?);
        Ok(())
    }

    /// Meters
    pub fn elevation(&self) -> Option<f64> {
        self.header.elev
    }

    pub fn set_elevation(&mut self, value: impl Into<PositionInput>) -> Result<()> {
        self.header.elev = Some(to_decimal_degrees(PositionKind::Elevation, value)?);
        Ok(())
    }

    /// Frequencies in Hz
    pub fn frequencies(&self) -> &[f64] {
        &self.z.freq
    }

    pub fn periods(&self) -> Vec<f64> {
        self.z.periods()
    }

    /// True when the tipper holds any nonzero value
    pub fn has_tipper(&self) -> bool {
        self.tipper.has_data()
    }
}

impl FromStr for Edi {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut edi = Edi::new();
        edi.parse_text(text)?;
        Ok(edi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer_function::Complex64;
    use tempfile::TempDir;

    const MINIMAL: &str = r#">HEAD
    DATAID="mt01"
    ELEV=None
    EMPTY=1.0E32

>INFO
    synthetic station

>=DEFINEMEAS
    MAXCHAN=4
    REFLAT=-30:00:00.00
    REFLON=139:30:00.00
    REFELEV=120.5
>HMEAS ID=1001.001 CHTYPE=HX X=0.0 Y=0.0 AZM=0.0
>EMEAS ID=1004.001 CHTYPE=EX X=-50.0 Y=0.0 X2=50.0 Y2=0.0

>=MTSECT
    EX=1004.001
    HX=1001.001
    NFREQ=2

>FREQ // 2
  1.000000e+01  1.000000e+00
>ZXXR ROT=ZROT // 2
  1.0 2.0
>ZXXI ROT=ZROT // 2
  0.5 1.0e32
>ZXX.VAR ROT=ZROT // 2
  0.1 0.1
>ZXYR ROT=ZROT // 2
  3.0 4.0
>ZXYI ROT=ZROT // 2
  -3.0 -4.0
>ZXY.VAR ROT=ZROT // 2
  0.1 0.1
>ZYXR ROT=ZROT // 2
  -3.0 -4.0
>ZYXI ROT=ZROT // 2
  3.0 4.0
>ZYX.VAR ROT=ZROT // 2
  0.1 0.1
>ZYYR ROT=ZROT // 2
  0.0 0.0
>ZYYI ROT=ZROT // 2
  0.0 0.0
>ZYY.VAR ROT=ZROT // 2
  0.1 0.1
>END
"#;

    #[test]
    fn test_parse_and_reconcile() {
        let edi: Edi = MINIMAL.parse().unwrap();

        assert_eq!(edi.station(), Some("mt01"));
        assert_eq!(edi.latitude(), Some(-30.0));
        assert_eq!(edi.longitude(), Some(139.5));
        assert_eq!(edi.elevation(), Some(120.5));
        assert_eq!(edi.frequencies(), &[10.0, 1.0]);
        assert_eq!(edi.periods(), vec![0.1, 1.0]);
        assert_eq!(edi.z.z[1][0][0], Complex64::new(2.0, 0.0));
        assert_eq!(edi.z.z[0][0][1], Complex64::new(3.0, -3.0));
        assert!(!edi.has_tipper());
        assert_eq!(edi.define_measurement.channels.len(), 2);
    }

    #[test]
    fn test_header_position_wins_over_reference() {
        let text = MINIMAL.replace("ELEV=None", "ELEV=10\n    LAT=-31:00:00");
        let edi: Edi = text.parse().unwrap();

        assert_eq!(edi.latitude(), Some(-31.0));
        assert_eq!(edi.longitude(), Some(139.5));
        assert_eq!(edi.elevation(), Some(10.0));
    }

    #[test]
    fn test_missing_data_section() {
        let result: Result<Edi> = ">HEAD\n    DATAID=x\n>END\n".parse();
        assert!(matches!(result, Err(Error::Format { .. })));
    }

    #[test]
    fn test_open_missing_file() {
        let result = Edi::open("/nonexistent/station.edi");
        assert!(matches!(result, Err(Error::MissingInput { .. })));
    }

    #[test]
    fn test_set_station_updates_both_sections() {
        let mut edi = Edi::new();
        edi.set_station(42);
        assert_eq!(edi.station(), Some("42"));
        assert_eq!(edi.data_sect.sectid.as_deref(), Some("42"));
    }

    #[test]
    fn test_position_setters_coerce() {
        let mut edi = Edi::new();
        edi.set_latitude("-12:30:00").unwrap();
        edi.set_longitude(130.25).unwrap();
        edi.set_elevation("n/a").unwrap();

        assert_eq!(edi.latitude(), Some(-12.5));
        assert_eq!(edi.longitude(), Some(130.25));
        assert_eq!(edi.elevation(), Some(0.0));
        assert!(matches!(
            edi.set_latitude("12:AB:10"),
            Err(Error::Format { .. })
        ));
        assert_eq!(edi.latitude(), Some(-12.5));
    }

    #[test]
    fn test_render_ends_with_end_marker() {
        let edi: Edi = MINIMAL.parse().unwrap();
        let text = edi.to_edi_string().unwrap();

        assert!(text.starts_with(">HEAD"));
        assert!(text.ends_with(">END\n"));
        assert!(text.contains(">=MTSECT\n    EX=1004.001"));
        assert!(text.contains("    SECTID=mt01"));
        assert!(text.contains(">TXR.EXP ROT=TROT // 2"));
    }

    #[test]
    fn test_save_reuses_source_path_uniquely() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("mt01.edi");
        fs::write(&source, MINIMAL).unwrap();

        let edi = Edi::open(&source).unwrap();
        let written = edi.save(None).unwrap();
        assert_eq!(written, temp_dir.path().join("mt01_1.edi"));
        assert_eq!(fs::read_to_string(&source).unwrap(), MINIMAL);

        let explicit = temp_dir.path().join("copy.edi");
        assert_eq!(edi.save(Some(&explicit)).unwrap(), explicit);
        assert!(explicit.exists());
    }

    #[test]
    fn test_save_refuses_inconsistent_model() {
        let temp_dir = TempDir::new().unwrap();
        let mut edi: Edi = MINIMAL.parse().unwrap();
        edi.z.z.pop();

        let target = temp_dir.path().join("bad.edi");
        assert!(matches!(
            edi.save(Some(&target)),
            Err(Error::InconsistentData { .. })
        ));
        assert!(!target.exists());
    }
}
