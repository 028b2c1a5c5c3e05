/// DISDRODB L0 processing library.
///
/// Transforms raw disdrometer text archives into standardized products:
/// L0A (tabular, Parquet) and L0B (arrays with unpacked particle
/// spectra, netCDF). The `run_disdrodb_*` binaries are thin shells over
/// the routines in [`routines`].

pub mod archive;
pub mod cli;
pub mod config;
pub mod l0;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod readers;
pub mod routines;
pub mod sensors;
pub mod transfer;

pub use archive::StationKey;
pub use metadata::StationMetadata;
pub use model::{DisdrodbError, ProcessingOptions, ProductLevel, Result};
pub use routines::{ArchiveFilters, RunSummary};
