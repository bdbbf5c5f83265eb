//! MT EDI Library
//!
//! A Rust library for reading and writing the EDI (Electrical Data Interchange)
//! files used in magnetotelluric geophysics to exchange impedance tensor and
//! tipper transfer functions.
//!
//! This library provides tools for:
//! - Parsing the `>HEAD`, `>INFO`, `>=DEFINEMEAS` and `>=MTSECT` sections,
//!   including the Phoenix and Winglink dialects
//! - Converting sexagesimal (`DD:MM:SS.ss`) positions to decimal degrees and back
//! - Decoding fixed-width numeric blocks into frequencies, a complex 2x2
//!   impedance tensor and a complex 1x2 tipper, with variances
//! - Re-rendering the whole document, atomically, as an EDI file

pub mod config;
pub mod constants;
pub mod document;
pub mod filesystem;
pub mod position;

pub mod sections {
    pub mod data_sect;
    pub mod define_meas;
    pub mod header;
    pub mod info;
    pub mod scan;

    pub use data_sect::{DataSection, DataType};
    pub use define_meas::{Channel, DefineMeasurement, ElectricChannel, MagneticChannel};
    pub use header::Header;
    pub use info::Information;
}

pub mod transfer_function;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::EdiConfig;
pub use document::Edi;
pub use position::{PositionInput, PositionKind};
pub use transfer_function::{ImpedanceTensor, RotationAngle, Tipper};

/// Result type alias for EDI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for EDI reading and writing
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// No input path was given, or the given path does not exist
    #[error("Missing input: {path}")]
    MissingInput { path: String },

    /// Malformed position string, marker or unwritable block
    #[error("Format error in {context}: {message}")]
    Format { context: String, message: String },

    /// Requested decode path has no implementation
    #[error("Not implemented: {feature}")]
    NotImplemented { feature: String },

    /// Numeric model does not satisfy its length invariants
    #[error("Inconsistent data: {message}")]
    InconsistentData { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Failed to move a finished temporary file into place
    #[error("Failed to persist '{path}'")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a missing input error
    pub fn missing_input(path: impl Into<String>) -> Self {
        Self::MissingInput { path: path.into() }
    }

    /// Create a format error naming the offending field or block
    pub fn format(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a not implemented error
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Create an inconsistent data error
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::InconsistentData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a persist error
    pub fn persist(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}
