//! Format constants for EDI files
//!
//! Section markers, numeric block formatting defaults and the banner
//! comments written between groups of transfer-function blocks.

// =============================================================================
// Section Markers
// =============================================================================

/// Header section marker
pub const HEAD_MARKER: &str = ">HEAD";

/// Information section marker
pub const INFO_MARKER: &str = ">INFO";

/// Define-measurement section marker
pub const DEFINEMEAS_MARKER: &str = ">=DEFINEMEAS";

/// Impedance/tipper data section marker
pub const MTSECT_MARKER: &str = ">=MTSECT";

/// Cross-power spectra data section marker
pub const SPECTRASECT_MARKER: &str = ">=SPECTRASECT";

/// Magnetic channel record marker
pub const HMEAS_MARKER: &str = ">HMEAS";

/// Electric channel record marker
pub const EMEAS_MARKER: &str = ">EMEAS";

/// Document terminator
pub const END_MARKER: &str = ">END";

// =============================================================================
// Numeric Blocks
// =============================================================================

/// Value written in place of missing data
pub const EMPTY_VALUE: f64 = 1.0e32;

/// Values per line in a numeric block
pub const DEFAULT_BLOCK_LEN: usize = 6;

/// Field width of a single formatted value
pub const DEFAULT_FIELD_WIDTH: usize = 15;

/// Digits after the decimal point in scientific notation
pub const DEFAULT_PRECISION: usize = 6;

/// Indentation of `KEY=VALUE` lines
pub const DEFAULT_INDENT: &str = "    ";

/// Text in the Information section that switches on the Phoenix column split
pub const PHOENIX_INFO_TRIGGER: &str = "run information";

/// Substring of PROGVERS identifying a Phoenix-written file
pub const PHOENIX_PROGVERS_MARKER: &str = "mt-editor";

/// Left column width of Phoenix two-column information text
pub const PHOENIX_COLUMN_SPLIT: usize = 37;

/// Minimum line length before a Phoenix information line is split
pub const PHOENIX_MIN_SPLIT_LEN: usize = 40;

/// Timestamp format used for FILEDATE
pub const FILEDATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S UTC";

// =============================================================================
// Banner comments
// =============================================================================

pub const FREQUENCY_BANNER: &str = "FREQUENCIES";
pub const ZROT_BANNER: &str = "IMPEDANCE ROTATION ANGLES";
pub const IMPEDANCE_BANNER: &str = "IMPEDANCES";
pub const TROT_BANNER: &str = "TIPPER ROTATION ANGLES";
pub const TIPPER_BANNER: &str = "TIPPER";

/// Render a banner comment line such as `!****FREQUENCIES****!`
pub fn banner(title: &str) -> String {
    format!("!****{}****!", title)
}
