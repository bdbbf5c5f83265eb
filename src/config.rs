//! Configuration for EDI output formatting.
//!
//! Controls how numeric blocks are laid out and which defaults are filled
//! into header fields the caller left unset. A configuration can be loaded
//! from a JSON file; keys it omits keep their defaults.

use crate::constants::{DEFAULT_BLOCK_LEN, DEFAULT_FIELD_WIDTH, DEFAULT_INDENT, DEFAULT_PRECISION};
use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Formatting and default-value configuration used when writing EDI files
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdiConfig {
    /// Number of values per line in a numeric block
    pub block_len: usize,

    /// Field width of each right-justified value
    pub field_width: usize,

    /// Digits after the decimal point
    pub precision: usize,

    /// Prefix for `KEY=VALUE` lines
    pub indent: String,

    /// Written for FILEBY and PROGVERS when those are unset
    pub program_name: String,

    /// Written for PROGDATE when unset
    pub program_date: String,

    /// Append `_N` to a derived save target that already exists
    pub unique_filenames: bool,
}

impl Default for EdiConfig {
    fn default() -> Self {
        Self {
            block_len: DEFAULT_BLOCK_LEN,
            field_width: DEFAULT_FIELD_WIDTH,
            precision: DEFAULT_PRECISION,
            indent: DEFAULT_INDENT.to_string(),
            program_name: env!("CARGO_PKG_NAME").to_string(),
            program_date: env!("CARGO_PKG_VERSION").to_string(),
            unique_filenames: true,
        }
    }
}

impl EdiConfig {
    /// Set the number of values per line
    pub fn with_block_len(mut self, block_len: usize) -> Self {
        self.block_len = block_len;
        self
    }

    /// Set the field width of formatted values
    pub fn with_field_width(mut self, field_width: usize) -> Self {
        self.field_width = field_width;
        self
    }

    /// Set the scientific-notation precision
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Set the indentation of `KEY=VALUE` lines
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Overwrite derived save targets instead of suffixing a counter
    pub fn without_unique_filenames(mut self) -> Self {
        self.unique_filenames = false;
        self
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::missing_input(path.display().to_string()));
        }

        let text = fs::read_to_string(path).map_err(|e| {
            Error::io(format!("Failed to read config file {}", path.display()), e)
        })?;
        let config: EdiConfig = serde_json::from_str(&text).map_err(|e| {
            Error::configuration(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        config.validate()?;

        debug!("Loaded configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Narrowest field that keeps a space before every value at this precision
    pub fn min_field_width(precision: usize) -> usize {
        // separator + sign + digit + point + precision + "e+NN"
        precision + 8
    }

    /// Check that the layout can hold a formatted value
    pub fn validate(&self) -> Result<()> {
        if self.block_len == 0 {
            return Err(Error::configuration("block_len must be at least 1"));
        }

        let min_width = Self::min_field_width(self.precision);
        if self.field_width < min_width {
            return Err(Error::configuration(format!(
                "field_width {} cannot hold a value with precision {} (need {})",
                self.field_width, self.precision, min_width
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EMPTY_VALUE;
    use crate::transfer_function::decoder::collect_blocks;
    use crate::transfer_function::write_data_block;
    use tempfile::TempDir;

    #[test]
    fn test_default_layout() {
        let config = EdiConfig::default();
        assert_eq!(config.block_len, 6);
        assert_eq!(config.field_width, 15);
        assert_eq!(config.precision, 6);
        assert_eq!(config.indent, "    ");
        assert!(config.unique_filenames);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = EdiConfig::default()
            .with_block_len(4)
            .with_precision(3)
            .with_field_width(12)
            .with_indent("  ")
            .without_unique_filenames();

        assert_eq!(config.block_len, 4);
        assert_eq!(config.precision, 3);
        assert_eq!(config.field_width, 12);
        assert_eq!(config.indent, "  ");
        assert!(!config.unique_filenames);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_layout() {
        let zero_block = EdiConfig::default().with_block_len(0);
        assert!(matches!(
            zero_block.validate(),
            Err(Error::Configuration { .. })
        ));

        let narrow = EdiConfig::default().with_field_width(8);
        assert!(matches!(narrow.validate(), Err(Error::Configuration { .. })));

        // a negative value fills 13 columns at precision 6
        let flush = EdiConfig::default().with_field_width(13);
        assert!(matches!(flush.validate(), Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_minimum_width_keeps_values_separated() {
        let config = EdiConfig::default().with_field_width(EdiConfig::min_field_width(6));
        assert_eq!(config.field_width, 14);
        assert!(config.validate().is_ok());

        let values = [1.5, -2.5, -0.125, 3.0e-5];
        let written = write_data_block(&values, "zxxr", EMPTY_VALUE, &config).unwrap();
        assert_eq!(written[1], "  1.500000e+00 -2.500000e+00 -1.250000e-01  3.000000e-05");

        let lines: Vec<&str> = written.iter().map(String::as_str).collect();
        let blocks = collect_blocks(&lines, EMPTY_VALUE).unwrap();
        assert_eq!(blocks["zxxr"].values, values.to_vec());
    }

    #[test]
    fn test_load_partial_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("edi.json");
        fs::write(&path, r#"{ "block_len": 4, "precision": 4, "field_width": 12 }"#).unwrap();

        let config = EdiConfig::from_json_file(&path).unwrap();
        assert_eq!(config.block_len, 4);
        assert_eq!(config.precision, 4);
        assert_eq!(config.field_width, 12);
        assert_eq!(config.indent, "    ");
        assert!(config.unique_filenames);
    }

    #[test]
    fn test_load_json_config_errors() {
        let temp_dir = TempDir::new().unwrap();

        let missing = EdiConfig::from_json_file(temp_dir.path().join("absent.json"));
        assert!(matches!(missing, Err(Error::MissingInput { .. })));

        let unknown = temp_dir.path().join("unknown.json");
        fs::write(&unknown, r#"{ "blocklen": 4 }"#).unwrap();
        assert!(matches!(
            EdiConfig::from_json_file(&unknown),
            Err(Error::Configuration { .. })
        ));

        let too_narrow = temp_dir.path().join("narrow.json");
        fs::write(&too_narrow, r#"{ "field_width": 13 }"#).unwrap();
        assert!(matches!(
            EdiConfig::from_json_file(&too_narrow),
            Err(Error::Configuration { .. })
        ));
    }
}
