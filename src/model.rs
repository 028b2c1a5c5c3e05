/// Core data types for the DISDRODB processing chain.
///
/// This module defines the shared domain model imported by all other modules:
/// the processing level enum, the processing options passed down from the CLI,
/// and the crate-wide error type.

use std::fmt;

// ---------------------------------------------------------------------------
// Product levels
// ---------------------------------------------------------------------------

/// DISDRODB processing levels handled by this crate.
///
/// L0A is the tabular (Parquet) form of the raw text files; L0B is the
/// array (netCDF) form with the particle spectrum unpacked over the
/// diameter and velocity bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductLevel {
    L0A,
    L0B,
}

impl ProductLevel {
    /// Directory name of the product inside the processed campaign directory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ProductLevel::L0A => "L0A",
            ProductLevel::L0B => "L0B",
        }
    }

    /// File extension of the product files.
    pub fn extension(&self) -> &'static str {
        match self {
            ProductLevel::L0A => "parquet",
            ProductLevel::L0B => "nc",
        }
    }
}

impl fmt::Display for ProductLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

// ---------------------------------------------------------------------------
// Processing options
// ---------------------------------------------------------------------------

/// Options shared by every L0 processing routine.
///
/// Mirrors the flags accepted by the `run_disdrodb_*` binaries. The
/// defaults match the conservative CLI defaults: never overwrite, stay
/// quiet, process sequentially, process everything.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingOptions {
    /// Overwrite existing products in the destination directories.
    pub force: bool,
    /// Print per-file processing information to the terminal.
    pub verbose: bool,
    /// Parse raw files concurrently.
    pub parallel: bool,
    /// Only process the first 3 raw files of each station.
    pub debugging_mode: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        ProcessingOptions {
            force: false,
            verbose: false,
            parallel: false,
            debugging_mode: false,
        }
    }
}

/// Number of raw files processed per station when `debugging_mode` is set.
pub const DEBUGGING_MODE_FILE_LIMIT: usize = 3;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while processing a DISDRODB archive.
#[derive(Debug)]
pub enum DisdrodbError {
    /// The archive layout is invalid (missing directory, bad campaign name, ...).
    InvalidArchive(String),
    /// A station metadata file is missing, unreadable or non-compliant.
    Metadata(String),
    /// The requested reader reference does not resolve to a registered reader.
    ReaderNotFound(String),
    /// The requested sensor is not in the sensor registry.
    SensorNotFound(String),
    /// A destination product directory already contains data and `force` is off.
    AlreadyProcessed(String),
    /// No raw or product files were found where some were required.
    NoDataFound(String),
    /// A raw file or a spectrum field could not be parsed.
    Parse(String),
    /// Non-2xx HTTP response while downloading station data.
    HttpError(u16),
    Io(std::io::Error),
    Polars(polars::error::PolarsError),
    NetCdf(netcdf::Error),
    Http(reqwest::Error),
}

impl fmt::Display for DisdrodbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisdrodbError::InvalidArchive(msg) => write!(f, "Invalid archive: {}", msg),
            DisdrodbError::Metadata(msg) => write!(f, "Metadata error: {}", msg),
            DisdrodbError::ReaderNotFound(name) => write!(f, "Reader not found: {}", name),
            DisdrodbError::SensorNotFound(name) => write!(f, "Sensor not found: {}", name),
            DisdrodbError::AlreadyProcessed(path) => {
                write!(f, "Data already exists in {} (use --force to overwrite)", path)
            }
            DisdrodbError::NoDataFound(msg) => write!(f, "No data found: {}", msg),
            DisdrodbError::Parse(msg) => write!(f, "Parse error: {}", msg),
            DisdrodbError::HttpError(code) => write!(f, "HTTP error: {}", code),
            DisdrodbError::Io(err) => write!(f, "IO error: {}", err),
            DisdrodbError::Polars(err) => write!(f, "Dataframe error: {}", err),
            DisdrodbError::NetCdf(err) => write!(f, "netCDF error: {}", err),
            DisdrodbError::Http(err) => write!(f, "HTTP request failed: {}", err),
        }
    }
}

impl std::error::Error for DisdrodbError {}

impl From<std::io::Error> for DisdrodbError {
    fn from(err: std::io::Error) -> Self {
        DisdrodbError::Io(err)
    }
}

impl From<polars::error::PolarsError> for DisdrodbError {
    fn from(err: polars::error::PolarsError) -> Self {
        DisdrodbError::Polars(err)
    }
}

impl From<netcdf::Error> for DisdrodbError {
    fn from(err: netcdf::Error) -> Self {
        DisdrodbError::NetCdf(err)
    }
}

impl From<reqwest::Error> for DisdrodbError {
    fn from(err: reqwest::Error) -> Self {
        DisdrodbError::Http(err)
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DisdrodbError>;
